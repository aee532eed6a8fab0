// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Host type descriptions and the schemas derived from them.
//!
//! A host type is what agent code declares for a parameter or return value.
//! The [`resolve::SchemaBuilder`] turns it into an [`AnalysedType`], or into
//! one of the special parameter kinds that have no component-model type of
//! their own (unstructured text and binary, multimodal lists, principals).

pub mod error;
pub mod resolve;

pub use error::SchemaError;
pub use resolve::{resolve_type, Restrictions, SchemaBuilder};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysed::AnalysedType;
use crate::host::TypedArrayKind;
use crate::unstructured::{BinaryDescriptor, TextDescriptor};

/// Named type declarations that [`HostType::Reference`] resolves against.
pub type TypeScope = BTreeMap<String, HostType>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HostType {
    Boolean,
    Number,
    #[serde(rename = "bigint")]
    BigInt,
    String,
    Char,
    Null,
    Undefined,
    Void,
    Any,
    Unknown,
    /// A number with an explicit component-model width.
    Numeric {
        width: NumericWidth,
    },
    Literal {
        value: LiteralValue,
    },
    Array {
        element: Box<HostType>,
    },
    TypedArray {
        element: TypedArrayKind,
    },
    Tuple {
        items: Vec<HostType>,
    },
    Map {
        key: Box<HostType>,
        value: Box<HostType>,
    },
    Object {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        properties: Vec<Property>,
    },
    Union {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        members: Vec<HostType>,
    },
    Promise {
        inner: Box<HostType>,
    },
    Alias {
        name: String,
        target: Box<HostType>,
    },
    Reference {
        name: String,
    },
    /// The built-in `Result<T, E>`. `void` stands for an absent payload.
    Result {
        ok: Box<HostType>,
        err: Box<HostType>,
    },
    Multimodal {
        element: Box<HostType>,
    },
    UnstructuredText,
    UnstructuredBinary,
    Principal,
    Function,
    /// Anything else the host can declare, kept for error messages.
    Other {
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: HostType,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumericWidth {
    S8,
    S16,
    S32,
    S64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumericWidth {
    pub fn analysed(&self) -> AnalysedType {
        match self {
            NumericWidth::S8 => AnalysedType::S8,
            NumericWidth::S16 => AnalysedType::S16,
            NumericWidth::S32 => AnalysedType::S32,
            NumericWidth::S64 => AnalysedType::S64,
            NumericWidth::U8 => AnalysedType::U8,
            NumericWidth::U16 => AnalysedType::U16,
            NumericWidth::U32 => AnalysedType::U32,
            NumericWidth::U64 => AnalysedType::U64,
            NumericWidth::F32 => AnalysedType::F32,
            NumericWidth::F64 => AnalysedType::F64,
        }
    }
}

impl HostType {
    pub fn array(element: HostType) -> HostType {
        HostType::Array {
            element: Box::new(element),
        }
    }

    pub fn object(properties: Vec<Property>) -> HostType {
        HostType::Object {
            name: None,
            properties,
        }
    }

    pub fn union(members: Vec<HostType>) -> HostType {
        HostType::Union {
            name: None,
            members,
        }
    }

    pub fn string_literal(value: &str) -> HostType {
        HostType::Literal {
            value: LiteralValue::String(value.to_string()),
        }
    }

    pub fn reference(name: &str) -> HostType {
        HostType::Reference {
            name: name.to_string(),
        }
    }

    pub fn promise(inner: HostType) -> HostType {
        HostType::Promise {
            inner: Box::new(inner),
        }
    }

    pub fn numeric(width: NumericWidth) -> HostType {
        HostType::Numeric { width }
    }

    /// `null`, `undefined` and `void` all denote absence.
    pub fn is_nullish(&self) -> bool {
        matches!(self, HostType::Null | HostType::Undefined | HostType::Void)
    }

    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            HostType::Literal {
                value: LiteralValue::String(s),
            } => Some(s),
            _ => None,
        }
    }

    /// Short name used in error messages.
    pub fn describe(&self) -> String {
        match self {
            HostType::Boolean => "boolean".to_string(),
            HostType::Number => "number".to_string(),
            HostType::BigInt => "bigint".to_string(),
            HostType::String => "string".to_string(),
            HostType::Char => "char".to_string(),
            HostType::Null => "null".to_string(),
            HostType::Undefined => "undefined".to_string(),
            HostType::Void => "void".to_string(),
            HostType::Any => "any".to_string(),
            HostType::Unknown => "unknown".to_string(),
            HostType::Numeric { width } => format!("{}", width.analysed()),
            HostType::Literal { value } => match value {
                LiteralValue::Bool(b) => b.to_string(),
                LiteralValue::Number(n) => n.to_string(),
                LiteralValue::String(s) => format!("\"{s}\""),
            },
            HostType::Array { element } => format!("{}[]", element.describe()),
            HostType::TypedArray { element } => element.host_name().to_string(),
            HostType::Tuple { .. } => "tuple".to_string(),
            HostType::Map { key, value } => {
                format!("Map<{}, {}>", key.describe(), value.describe())
            }
            HostType::Object { name, .. } => name.clone().unwrap_or_else(|| "object".to_string()),
            HostType::Union { name, .. } => name.clone().unwrap_or_else(|| "union".to_string()),
            HostType::Promise { inner } => format!("Promise<{}>", inner.describe()),
            HostType::Alias { name, .. } | HostType::Reference { name } => name.clone(),
            HostType::Result { .. } => "Result".to_string(),
            HostType::Multimodal { .. } => "Multimodal".to_string(),
            HostType::UnstructuredText => "UnstructuredText".to_string(),
            HostType::UnstructuredBinary => "UnstructuredBinary".to_string(),
            HostType::Principal => "Principal".to_string(),
            HostType::Function => "function".to_string(),
            HostType::Other { description } => description.clone(),
        }
    }
}

/// How a single parameter or return value is carried on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeInfoInternal {
    /// A component-model value of `typ`, declared on the host as `host_type`.
    ///
    /// Mapping reads only `typ`. Record fields nested in it have no host type
    /// of their own, so falsy defaults are chosen from the field's
    /// `AnalysedType`. `host_type` is the declared signature as registered,
    /// kept for callers that display or compare it.
    Analysed {
        typ: AnalysedType,
        host_type: HostType,
    },
    UnstructuredText {
        descriptor: TextDescriptor,
    },
    UnstructuredBinary {
        descriptor: BinaryDescriptor,
    },
    /// A list whose elements are each one of the alternatives.
    Multimodal {
        alternatives: Vec<MultimodalAlternative>,
    },
    Principal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultimodalAlternative {
    pub name: String,
    pub info: TypeInfoInternal,
    /// Payload property when the host wraps elements as `{ tag: name, <field>: payload }`.
    pub payload_field: Option<String>,
}

impl TypeInfoInternal {
    pub fn analysed(typ: AnalysedType, host_type: HostType) -> TypeInfoInternal {
        TypeInfoInternal::Analysed { typ, host_type }
    }

    pub fn is_principal(&self) -> bool {
        matches!(self, TypeInfoInternal::Principal)
    }

    pub fn is_multimodal(&self) -> bool {
        matches!(self, TypeInfoInternal::Multimodal { .. })
    }
}
