// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Unstructured text and binary values.
//!
//! On the host side a reference is an object tagged `url` or `inline`:
//! text as `{ tag, val, languageCode? }`, binary as `{ tag, val, mimeType }`
//! where an inline binary `val` is a `Uint8Array`.

#![allow(clippy::pattern_type_mismatch, clippy::expect_used)] // patterns are static

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::host::{HostValue, TypedArray};
use crate::mapping::MappingError;

lazy_static! {
    static ref LANGUAGE_CODE: Regex = Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$")
        .expect("language code pattern should compile");
    static ref MIME_TYPE: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/(\*|[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*)$")
            .expect("MIME type pattern should compile");
}

/// Checks a BCP-47 style language code such as `en` or `pt-BR`.
pub fn is_valid_language_code(code: &str) -> bool {
    LANGUAGE_CODE.is_match(code)
}

/// Checks a `type/subtype` MIME type. The subtype may be `*`.
pub fn is_valid_mime_type(mime: &str) -> bool {
    MIME_TYPE.is_match(mime)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextType {
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSource {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_type: Option<TextType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TextReference {
    Url(Url),
    Inline(TextSource),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryType {
    pub mime_type: String,
}

/// Inline bytes, written as base64 in textual encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinarySource {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub binary_type: BinaryType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BinaryReference {
    Url(Url),
    Inline(BinarySource),
}

mod base64_bytes {
    use data_encoding::BASE64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Allowed language codes of a text parameter. `None` accepts any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<TextType>>,
}

/// Allowed MIME types of a binary parameter. `None` accepts any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<BinaryType>>,
}

impl TextDescriptor {
    pub fn new(languages: &[String]) -> TextDescriptor {
        TextDescriptor {
            restrictions: if languages.is_empty() {
                None
            } else {
                Some(
                    languages
                        .iter()
                        .map(|l| TextType {
                            language_code: l.clone(),
                        })
                        .collect(),
                )
            },
        }
    }

    /// Rejects inline text whose language is outside the restrictions.
    /// URLs and text without a language code pass.
    pub fn check(&self, reference: &TextReference) -> Result<(), MappingError> {
        let (Some(allowed), TextReference::Inline(source)) = (&self.restrictions, reference) else {
            return Ok(());
        };
        let Some(text_type) = &source.text_type else {
            return Ok(());
        };
        if allowed
            .iter()
            .any(|t| t.language_code.eq_ignore_ascii_case(&text_type.language_code))
        {
            Ok(())
        } else {
            Err(MappingError::RestrictionViolated {
                kind: "language code".to_string(),
                value: text_type.language_code.clone(),
                allowed: allowed.iter().map(|t| t.language_code.clone()).collect(),
            })
        }
    }
}

impl BinaryDescriptor {
    pub fn new(mime_types: &[String]) -> BinaryDescriptor {
        BinaryDescriptor {
            restrictions: if mime_types.is_empty() {
                None
            } else {
                Some(
                    mime_types
                        .iter()
                        .map(|m| BinaryType {
                            mime_type: m.clone(),
                        })
                        .collect(),
                )
            },
        }
    }

    pub fn check(&self, reference: &BinaryReference) -> Result<(), MappingError> {
        let (Some(allowed), BinaryReference::Inline(source)) = (&self.restrictions, reference)
        else {
            return Ok(());
        };
        let mime = &source.binary_type.mime_type;
        if allowed.iter().any(|b| mime_matches(&b.mime_type, mime)) {
            Ok(())
        } else {
            Err(MappingError::RestrictionViolated {
                kind: "MIME type".to_string(),
                value: mime.clone(),
                allowed: allowed.iter().map(|b| b.mime_type.clone()).collect(),
            })
        }
    }
}

/// `image/*` admits every image subtype.
fn mime_matches(pattern: &str, mime: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => mime
            .split_once('/')
            .is_some_and(|(top, _)| top.eq_ignore_ascii_case(prefix)),
        None => pattern.eq_ignore_ascii_case(mime),
    }
}

fn reference_tag<'v>(value: &'v HostValue, kind: &str) -> Result<&'v str, MappingError> {
    if !matches!(value, HostValue::Object(_)) {
        return Err(MappingError::TypeMismatch {
            expected: format!("{kind} reference"),
            actual: value.type_name().to_string(),
            path: String::new(),
        });
    }
    match value.field("tag") {
        Some(HostValue::String(tag)) => Ok(&**tag),
        _ => Err(MappingError::MissingTag {
            tag_field: "tag".to_string(),
            path: String::new(),
        }),
    }
}

fn string_field(value: &HostValue, field: &str) -> Result<String, MappingError> {
    match value.field(field) {
        Some(HostValue::String(s)) => Ok(s.to_string()),
        Some(other) => Err(MappingError::TypeMismatch {
            expected: "string".to_string(),
            actual: other.type_name().to_string(),
            path: field.to_string(),
        }),
        None => Err(MappingError::MissingField {
            field: field.to_string(),
            path: String::new(),
        }),
    }
}

fn unknown_reference_tag(tag: &str) -> MappingError {
    MappingError::UnknownTag {
        tag: tag.to_string(),
        allowed: vec!["url".to_string(), "inline".to_string()],
        path: String::new(),
    }
}

impl TextReference {
    pub fn from_host(value: &HostValue) -> Result<TextReference, MappingError> {
        match reference_tag(value, "text")? {
            "url" => Ok(TextReference::Url(Url {
                value: string_field(value, "val")?,
            })),
            "inline" => {
                let text_type = match value.field("languageCode") {
                    None => None,
                    Some(_) => Some(TextType {
                        language_code: string_field(value, "languageCode")?,
                    }),
                };
                Ok(TextReference::Inline(TextSource {
                    data: string_field(value, "val")?,
                    text_type,
                }))
            }
            other => Err(unknown_reference_tag(other)),
        }
    }

    pub fn to_host(&self) -> HostValue {
        match self {
            TextReference::Url(url) => HostValue::object([
                ("tag", HostValue::from("url")),
                ("val", HostValue::from(url.value.as_str())),
            ]),
            TextReference::Inline(source) => {
                let mut entries = vec![
                    ("tag", HostValue::from("inline")),
                    ("val", HostValue::from(source.data.as_str())),
                ];
                if let Some(t) = &source.text_type {
                    entries.push(("languageCode", HostValue::from(t.language_code.as_str())));
                }
                HostValue::object(entries)
            }
        }
    }

    /// Shape test used to route multimodal elements.
    pub fn accepts(value: &HostValue) -> bool {
        match value.field("tag") {
            Some(HostValue::String(tag)) if &**tag == "url" || &**tag == "inline" => {
                matches!(value.field("val"), Some(HostValue::String(_)))
                    && value.field("mimeType").is_none()
            }
            _ => false,
        }
    }
}

impl BinaryReference {
    pub fn from_host(value: &HostValue) -> Result<BinaryReference, MappingError> {
        match reference_tag(value, "binary")? {
            "url" => Ok(BinaryReference::Url(Url {
                value: string_field(value, "val")?,
            })),
            "inline" => {
                let data = match value.field("val") {
                    Some(HostValue::TypedArray(array)) => match array.as_ref() {
                        TypedArray::Uint8(bytes) => bytes.clone(),
                        other => {
                            return Err(MappingError::TypeMismatch {
                                expected: "Uint8Array".to_string(),
                                actual: other.kind().host_name().to_string(),
                                path: "val".to_string(),
                            })
                        }
                    },
                    Some(other) => {
                        return Err(MappingError::TypeMismatch {
                            expected: "Uint8Array".to_string(),
                            actual: other.type_name().to_string(),
                            path: "val".to_string(),
                        })
                    }
                    None => {
                        return Err(MappingError::MissingField {
                            field: "val".to_string(),
                            path: String::new(),
                        })
                    }
                };
                Ok(BinaryReference::Inline(BinarySource {
                    data,
                    binary_type: BinaryType {
                        mime_type: string_field(value, "mimeType")?,
                    },
                }))
            }
            other => Err(unknown_reference_tag(other)),
        }
    }

    pub fn to_host(&self) -> HostValue {
        match self {
            BinaryReference::Url(url) => HostValue::object([
                ("tag", HostValue::from("url")),
                ("val", HostValue::from(url.value.as_str())),
            ]),
            BinaryReference::Inline(source) => HostValue::object([
                ("tag", HostValue::from("inline")),
                (
                    "val",
                    HostValue::from(TypedArray::Uint8(source.data.clone())),
                ),
                (
                    "mimeType",
                    HostValue::from(source.binary_type.mime_type.as_str()),
                ),
            ]),
        }
    }

    pub fn accepts(value: &HostValue) -> bool {
        match value.field("tag") {
            Some(HostValue::String(tag)) if &**tag == "url" => {
                matches!(value.field("val"), Some(HostValue::String(_)))
            }
            Some(HostValue::String(tag)) if &**tag == "inline" => {
                matches!(value.field("val"), Some(HostValue::TypedArray(_)))
                    && matches!(value.field("mimeType"), Some(HostValue::String(_)))
            }
            _ => false,
        }
    }
}
