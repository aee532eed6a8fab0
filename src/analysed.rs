// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Component-model type algebra.
//!
//! Besides the structural shape of a type, compound types remember how their
//! values are spelled on the host side: which typed array or map a list came
//! from, which field discriminates a tagged variant, and under which property
//! names a result carries its payloads.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::host::TypedArrayKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AnalysedType {
    Bool,
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
    #[serde(rename = "char")]
    Chr,
    #[serde(rename = "string")]
    Str,
    List(TypeList),
    Option(TypeOption),
    Tuple(TypeTuple),
    Record(TypeRecord),
    Variant(TypeVariant),
    Result(TypeResult),
    Enum(TypeEnum),
    Flags(TypeFlags),
    Handle(TypeHandle),
}

/// How the elements of a list are represented by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListEncoding {
    #[default]
    Sequence,
    TypedArray(TypedArrayKind),
    /// `list<tuple<k, v>>` produced from a host `Map`.
    Map,
}

impl ListEncoding {
    pub fn is_sequence(&self) -> bool {
        matches!(self, ListEncoding::Sequence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeList {
    pub inner: Box<AnalysedType>,
    #[serde(default, skip_serializing_if = "ListEncoding::is_sequence")]
    pub encoding: ListEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeOption {
    pub inner: Box<AnalysedType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeTuple {
    pub items: Vec<AnalysedType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameTypePair {
    pub name: String,
    pub typ: AnalysedType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fields: Vec<NameTypePair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<AnalysedType>,
    /// Property holding the payload of a tagged case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_field: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantTagging {
    /// Cases are told apart by the shape of the value.
    #[default]
    Untagged,
    /// Cases are objects discriminated by a string property.
    Tagged { tag_field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cases: Vec<VariantCase>,
    #[serde(default)]
    pub tagging: VariantTagging,
}

/// Host property names of the two result payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultShape {
    pub ok_field: String,
    pub err_field: String,
}

impl ResultShape {
    pub fn new(ok_field: &str, err_field: &str) -> ResultShape {
        ResultShape {
            ok_field: ok_field.to_string(),
            err_field: err_field.to_string(),
        }
    }
}

impl Default for ResultShape {
    fn default() -> Self {
        ResultShape::new("val", "val")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeResult {
    pub ok: Option<Box<AnalysedType>>,
    pub err: Option<Box<AnalysedType>>,
    #[serde(default)]
    pub shape: ResultShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeEnum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceMode {
    Owned,
    Borrowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeHandle {
    pub resource_id: u64,
    pub mode: ResourceMode,
}

impl AnalysedType {
    /// Short kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnalysedType::Bool => "bool",
            AnalysedType::S8 => "s8",
            AnalysedType::S16 => "s16",
            AnalysedType::S32 => "s32",
            AnalysedType::S64 => "s64",
            AnalysedType::U8 => "u8",
            AnalysedType::U16 => "u16",
            AnalysedType::U32 => "u32",
            AnalysedType::U64 => "u64",
            AnalysedType::F32 => "f32",
            AnalysedType::F64 => "f64",
            AnalysedType::Chr => "char",
            AnalysedType::Str => "string",
            AnalysedType::List(_) => "list",
            AnalysedType::Option(_) => "option",
            AnalysedType::Tuple(_) => "tuple",
            AnalysedType::Record(_) => "record",
            AnalysedType::Variant(_) => "variant",
            AnalysedType::Result(_) => "result",
            AnalysedType::Enum(_) => "enum",
            AnalysedType::Flags(_) => "flags",
            AnalysedType::Handle(_) => "handle",
        }
    }

    /// Kind name plus the declared name, when the type has one.
    pub fn describe(&self) -> String {
        let name = match self {
            AnalysedType::Record(r) => r.name.as_deref(),
            AnalysedType::Variant(v) => v.name.as_deref(),
            AnalysedType::Enum(e) => e.name.as_deref(),
            AnalysedType::Flags(f) => f.name.as_deref(),
            AnalysedType::List(_) | AnalysedType::Option(_) | AnalysedType::Tuple(_) => {
                return self.to_string()
            }
            _ => None,
        };
        match name {
            Some(name) => format!("{} {name}", self.kind_name()),
            None => self.kind_name().to_string(),
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, AnalysedType::Option(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            AnalysedType::S8
                | AnalysedType::S16
                | AnalysedType::S32
                | AnalysedType::S64
                | AnalysedType::U8
                | AnalysedType::U16
                | AnalysedType::U32
                | AnalysedType::U64
        )
    }

    pub fn is_64bit_integer(&self) -> bool {
        matches!(self, AnalysedType::S64 | AnalysedType::U64)
    }
}

impl TypedArrayKind {
    /// Element type of the list a typed array of this kind maps to.
    pub fn element_type(&self) -> AnalysedType {
        match self {
            TypedArrayKind::Uint8 => AnalysedType::U8,
            TypedArrayKind::Uint16 => AnalysedType::U16,
            TypedArrayKind::Uint32 => AnalysedType::U32,
            TypedArrayKind::BigUint64 => AnalysedType::U64,
            TypedArrayKind::Int8 => AnalysedType::S8,
            TypedArrayKind::Int16 => AnalysedType::S16,
            TypedArrayKind::Int32 => AnalysedType::S32,
            TypedArrayKind::BigInt64 => AnalysedType::S64,
            TypedArrayKind::Float32 => AnalysedType::F32,
            TypedArrayKind::Float64 => AnalysedType::F64,
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for AnalysedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysedType::List(l) => write!(f, "list<{}>", l.inner),
            AnalysedType::Option(o) => write!(f, "option<{}>", o.inner),
            AnalysedType::Tuple(t) => {
                f.write_str("tuple<")?;
                write_joined(f, &t.items)?;
                f.write_str(">")
            }
            AnalysedType::Record(r) => {
                f.write_str("record { ")?;
                for (idx, field) in r.fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.typ)?;
                }
                f.write_str(" }")
            }
            AnalysedType::Variant(v) => {
                f.write_str("variant { ")?;
                for (idx, case) in v.cases.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    match &case.typ {
                        Some(typ) => write!(f, "{}({typ})", case.name)?,
                        None => f.write_str(&case.name)?,
                    }
                }
                f.write_str(" }")
            }
            AnalysedType::Result(r) => match (&r.ok, &r.err) {
                (None, None) => f.write_str("result"),
                (Some(ok), None) => write!(f, "result<{ok}>"),
                (None, Some(err)) => write!(f, "result<_, {err}>"),
                (Some(ok), Some(err)) => write!(f, "result<{ok}, {err}>"),
            },
            AnalysedType::Enum(e) => {
                f.write_str("enum { ")?;
                write_joined(f, &e.cases)?;
                f.write_str(" }")
            }
            AnalysedType::Flags(fl) => {
                f.write_str("flags { ")?;
                write_joined(f, &fl.names)?;
                f.write_str(" }")
            }
            AnalysedType::Handle(h) => match h.mode {
                ResourceMode::Owned => write!(f, "own<{}>", h.resource_id),
                ResourceMode::Borrowed => write!(f, "borrow<{}>", h.resource_id),
            },
            _ => f.write_str(self.kind_name()),
        }
    }
}

// Constructors mirroring the component-model type syntax.

pub fn bool() -> AnalysedType {
    AnalysedType::Bool
}

pub fn s8() -> AnalysedType {
    AnalysedType::S8
}

pub fn s16() -> AnalysedType {
    AnalysedType::S16
}

pub fn s32() -> AnalysedType {
    AnalysedType::S32
}

pub fn s64() -> AnalysedType {
    AnalysedType::S64
}

pub fn u8() -> AnalysedType {
    AnalysedType::U8
}

pub fn u16() -> AnalysedType {
    AnalysedType::U16
}

pub fn u32() -> AnalysedType {
    AnalysedType::U32
}

pub fn u64() -> AnalysedType {
    AnalysedType::U64
}

pub fn f32() -> AnalysedType {
    AnalysedType::F32
}

pub fn f64() -> AnalysedType {
    AnalysedType::F64
}

pub fn chr() -> AnalysedType {
    AnalysedType::Chr
}

pub fn str() -> AnalysedType {
    AnalysedType::Str
}

pub fn list(inner: AnalysedType) -> AnalysedType {
    AnalysedType::List(TypeList {
        inner: Box::new(inner),
        encoding: ListEncoding::Sequence,
    })
}

pub fn typed_array(kind: TypedArrayKind) -> AnalysedType {
    AnalysedType::List(TypeList {
        inner: Box::new(kind.element_type()),
        encoding: ListEncoding::TypedArray(kind),
    })
}

pub fn map(key: AnalysedType, value: AnalysedType) -> AnalysedType {
    AnalysedType::List(TypeList {
        inner: Box::new(tuple(vec![key, value])),
        encoding: ListEncoding::Map,
    })
}

pub fn option(inner: AnalysedType) -> AnalysedType {
    AnalysedType::Option(TypeOption {
        inner: Box::new(inner),
    })
}

pub fn tuple(items: Vec<AnalysedType>) -> AnalysedType {
    AnalysedType::Tuple(TypeTuple { items })
}

/// The empty tuple.
pub fn unit() -> AnalysedType {
    tuple(vec![])
}

pub fn field(name: &str, typ: AnalysedType) -> NameTypePair {
    NameTypePair {
        name: name.to_string(),
        typ,
    }
}

pub fn record(fields: Vec<NameTypePair>) -> AnalysedType {
    AnalysedType::Record(TypeRecord { name: None, fields })
}

pub fn case(name: &str, typ: AnalysedType) -> VariantCase {
    VariantCase {
        name: name.to_string(),
        typ: Some(typ),
        payload_field: None,
    }
}

pub fn unit_case(name: &str) -> VariantCase {
    VariantCase {
        name: name.to_string(),
        typ: None,
        payload_field: None,
    }
}

/// A case of a tagged variant carrying its payload in `payload_field`.
pub fn tagged_case(name: &str, payload_field: &str, typ: AnalysedType) -> VariantCase {
    VariantCase {
        name: name.to_string(),
        typ: Some(typ),
        payload_field: Some(payload_field.to_string()),
    }
}

pub fn variant(cases: Vec<VariantCase>) -> AnalysedType {
    AnalysedType::Variant(TypeVariant {
        name: None,
        cases,
        tagging: VariantTagging::Untagged,
    })
}

pub fn tagged_variant(tag_field: &str, cases: Vec<VariantCase>) -> AnalysedType {
    AnalysedType::Variant(TypeVariant {
        name: None,
        cases,
        tagging: VariantTagging::Tagged {
            tag_field: tag_field.to_string(),
        },
    })
}

pub fn result(ok: AnalysedType, err: AnalysedType) -> AnalysedType {
    result_with_shape(Some(ok), Some(err), ResultShape::default())
}

pub fn result_ok(ok: AnalysedType) -> AnalysedType {
    result_with_shape(Some(ok), None, ResultShape::default())
}

pub fn result_err(err: AnalysedType) -> AnalysedType {
    result_with_shape(None, Some(err), ResultShape::default())
}

pub fn result_with_shape(
    ok: Option<AnalysedType>,
    err: Option<AnalysedType>,
    shape: ResultShape,
) -> AnalysedType {
    AnalysedType::Result(TypeResult {
        ok: ok.map(Box::new),
        err: err.map(Box::new),
        shape,
    })
}

pub fn r#enum(cases: &[&str]) -> AnalysedType {
    AnalysedType::Enum(TypeEnum {
        name: None,
        cases: cases.iter().map(|c| c.to_string()).collect(),
    })
}

pub fn flags(names: &[&str]) -> AnalysedType {
    AnalysedType::Flags(TypeFlags {
        name: None,
        names: names.iter().map(|n| n.to_string()).collect(),
    })
}

pub fn handle(resource_id: u64, mode: ResourceMode) -> AnalysedType {
    AnalysedType::Handle(TypeHandle { resource_id, mode })
}

impl AnalysedType {
    /// Attaches a declared name to a record, variant, enum or flags type.
    pub fn named(mut self, name: &str) -> AnalysedType {
        match &mut self {
            AnalysedType::Record(r) => r.name = Some(name.to_string()),
            AnalysedType::Variant(v) => v.name = Some(name.to_string()),
            AnalysedType::Enum(e) => e.name = Some(name.to_string()),
            AnalysedType::Flags(f) => f.name = Some(name.to_string()),
            _ => (),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn display() {
        let t = record(vec![
            field("name", str()),
            field("tags", list(option(u8()))),
            field("pair", tuple(vec![s64(), chr()])),
        ]);
        assert_eq!(
            t.to_string(),
            "record { name: string, tags: list<option<u8>>, pair: tuple<s64, char> }"
        );
        assert_eq!(result_err(str()).to_string(), "result<_, string>");
        assert_eq!(
            variant(vec![unit_case("none"), case("some", u32())]).to_string(),
            "variant { none, some(u32) }"
        );
        assert_eq!(r#enum(&["a", "b"]).to_string(), "enum { a, b }");
    }

    #[test]
    fn describe_uses_declared_names() {
        assert_eq!(record(vec![]).named("Person").describe(), "record Person");
        assert_eq!(r#enum(&["x"]).describe(), "enum");
        assert_eq!(list(str()).describe(), "list<string>");
        assert_eq!(u16().describe(), "u16");
    }

    #[test]
    fn typed_array_lists() {
        let t = typed_array(TypedArrayKind::BigInt64);
        let AnalysedType::List(l) = &t else {
            panic!("expected a list");
        };
        assert_eq!(*l.inner, AnalysedType::S64);
        assert_eq!(l.encoding, ListEncoding::TypedArray(TypedArrayKind::BigInt64));
    }

    #[test]
    fn serde_shape() {
        let t = option(str());
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"type":"option","inner":{"type":"string"}}"#);
        let back: AnalysedType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        let r = result(u32(), str());
        let back: AnalysedType =
            serde_json::from_str(&serde_json::to_string(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }
}
