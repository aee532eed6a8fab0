// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

use crate::analysed::{AnalysedType, ListEncoding, TypeRecord, TypeVariant, VariantTagging};
use crate::host::HostValue;

/// Structural check used to pick the case of an untagged union.
///
/// Records accept objects with extra properties, and optional fields may be
/// absent. Integers are checked against the range of their width.
pub fn matches_type(value: &HostValue, typ: &AnalysedType) -> bool {
    match typ {
        AnalysedType::Bool => matches!(value, HostValue::Bool(_)),
        AnalysedType::S8
        | AnalysedType::S16
        | AnalysedType::S32
        | AnalysedType::S64
        | AnalysedType::U8
        | AnalysedType::U16
        | AnalysedType::U32
        | AnalysedType::U64 => matches_integer(value, typ),
        AnalysedType::F32 | AnalysedType::F64 => matches!(value, HostValue::Number(_)),
        AnalysedType::Chr => match value {
            HostValue::String(s) => s.chars().count() == 1,
            _ => false,
        },
        AnalysedType::Str => matches!(value, HostValue::String(_)),
        AnalysedType::List(list) => match (&list.encoding, value) {
            (ListEncoding::TypedArray(kind), HostValue::TypedArray(array)) => array.kind() == *kind,
            (ListEncoding::Map, HostValue::Map(entries)) => match list.inner.as_ref() {
                AnalysedType::Tuple(t) if t.items.len() == 2 => entries
                    .iter()
                    .all(|(k, v)| matches_type(k, &t.items[0]) && matches_type(v, &t.items[1])),
                _ => false,
            },
            (_, HostValue::Array(items)) => items.iter().all(|i| matches_type(i, &list.inner)),
            (ListEncoding::Sequence, HostValue::TypedArray(array)) => array
                .elements()
                .iter()
                .all(|i| matches_type(i, &list.inner)),
            _ => false,
        },
        AnalysedType::Option(option) => value.is_nullish() || matches_type(value, &option.inner),
        AnalysedType::Tuple(tuple) => match value {
            HostValue::Array(items) => {
                items.len() == tuple.items.len()
                    && items
                        .iter()
                        .zip(tuple.items.iter())
                        .all(|(i, t)| matches_type(i, t))
            }
            _ => tuple.items.is_empty() && value.is_nullish(),
        },
        AnalysedType::Record(record) => matches_record(value, record),
        AnalysedType::Variant(variant) => matches_variant(value, variant),
        AnalysedType::Result(result) => match value.field("tag") {
            Some(HostValue::String(tag)) if &**tag == "ok" => {
                matches_payload(value, result.ok.as_deref(), &result.shape.ok_field)
            }
            Some(HostValue::String(tag)) if &**tag == "err" => {
                matches_payload(value, result.err.as_deref(), &result.shape.err_field)
            }
            _ => false,
        },
        AnalysedType::Enum(e) => match value {
            HostValue::String(s) => e.cases.iter().any(|c| c.as_str() == &**s),
            _ => false,
        },
        AnalysedType::Flags(flags) => match value {
            HostValue::Object(fields) => fields.iter().all(|(k, v)| {
                matches!(v, HostValue::Bool(_)) && flags.names.iter().any(|n| n.as_str() == &**k)
            }),
            _ => false,
        },
        AnalysedType::Handle(_) => false,
    }
}

fn matches_integer(value: &HostValue, typ: &AnalysedType) -> bool {
    let n = match value {
        HostValue::Number(n) => n.as_i128(),
        HostValue::BigInt(b) if typ.is_64bit_integer() => crate::number::bigint_to_i128(b),
        _ => None,
    };
    let Some(n) = n else {
        return false;
    };
    match typ {
        AnalysedType::S8 => i8::try_from(n).is_ok(),
        AnalysedType::S16 => i16::try_from(n).is_ok(),
        AnalysedType::S32 => i32::try_from(n).is_ok(),
        AnalysedType::S64 => i64::try_from(n).is_ok(),
        AnalysedType::U8 => u8::try_from(n).is_ok(),
        AnalysedType::U16 => u16::try_from(n).is_ok(),
        AnalysedType::U32 => u32::try_from(n).is_ok(),
        AnalysedType::U64 => u64::try_from(n).is_ok(),
        _ => false,
    }
}

fn matches_record(value: &HostValue, record: &TypeRecord) -> bool {
    if !matches!(value, HostValue::Object(_)) {
        return false;
    }
    record.fields.iter().all(|f| match value.field(&f.name) {
        Some(v) => matches_type(v, &f.typ),
        None => f.typ.is_option(),
    })
}

fn matches_variant(value: &HostValue, variant: &TypeVariant) -> bool {
    match &variant.tagging {
        VariantTagging::Untagged => variant.cases.iter().any(|c| match &c.typ {
            None => matches!(value, HostValue::String(s) if c.name.as_str() == &**s),
            Some(t) => matches_type(value, t),
        }),
        VariantTagging::Tagged { tag_field } => match value.field(tag_field) {
            Some(HostValue::String(tag)) => {
                variant
                    .cases
                    .iter()
                    .find(|c| c.name.as_str() == &**tag)
                    .is_some_and(|c| match &c.typ {
                        None => true,
                        Some(t) => {
                            let field = c.payload_field.as_deref().unwrap_or("val");
                            matches_payload(value, Some(t), field)
                        }
                    })
            }
            _ => false,
        },
    }
}

fn matches_payload(value: &HostValue, typ: Option<&AnalysedType>, field: &str) -> bool {
    match typ {
        None => true,
        Some(t) => match value.field(field) {
            Some(v) => matches_type(v, t),
            None => t.is_option(),
        },
    }
}
