// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch, clippy::as_conversions)]

use log::trace;

use crate::analysed::{
    AnalysedType, ListEncoding, TypeEnum, TypeFlags, TypeList, TypeRecord, TypeResult, TypeTuple,
    TypeVariant, VariantTagging,
};
use crate::host::{HostValue, TypedArray};
use crate::mapping::{describe_value, field_path, index_path, matches_type, MappingError};
use crate::number::bigint_to_i128;
use crate::options::MappingOptions;
use crate::value::Value;

/// Converts host values into wire values of a given type.
#[derive(Debug, Clone, Copy)]
pub struct ValueSerializer<'a> {
    options: &'a MappingOptions,
}

fn type_mismatch(typ: &AnalysedType, value: &HostValue, path: &str) -> MappingError {
    MappingError::TypeMismatch {
        expected: typ.describe(),
        actual: describe_value(value),
        path: path.to_string(),
    }
}

/// Zero value substituted for a missing field when falsy defaults are on.
fn falsy_default(typ: &AnalysedType) -> Option<Value> {
    Some(match typ {
        AnalysedType::Bool => Value::Bool(false),
        AnalysedType::Str => Value::String(String::new()),
        AnalysedType::S8 => Value::S8(0),
        AnalysedType::S16 => Value::S16(0),
        AnalysedType::S32 => Value::S32(0),
        AnalysedType::S64 => Value::S64(0),
        AnalysedType::U8 => Value::U8(0),
        AnalysedType::U16 => Value::U16(0),
        AnalysedType::U32 => Value::U32(0),
        AnalysedType::U64 => Value::U64(0),
        AnalysedType::F32 => Value::F32(0.0),
        AnalysedType::F64 => Value::F64(0.0),
        _ => return None,
    })
}

fn typed_array_values(array: &TypedArray) -> Vec<Value> {
    match array {
        TypedArray::Uint8(v) => v.iter().map(|e| Value::U8(*e)).collect(),
        TypedArray::Uint16(v) => v.iter().map(|e| Value::U16(*e)).collect(),
        TypedArray::Uint32(v) => v.iter().map(|e| Value::U32(*e)).collect(),
        TypedArray::BigUint64(v) => v.iter().map(|e| Value::U64(*e)).collect(),
        TypedArray::Int8(v) => v.iter().map(|e| Value::S8(*e)).collect(),
        TypedArray::Int16(v) => v.iter().map(|e| Value::S16(*e)).collect(),
        TypedArray::Int32(v) => v.iter().map(|e| Value::S32(*e)).collect(),
        TypedArray::BigInt64(v) => v.iter().map(|e| Value::S64(*e)).collect(),
        TypedArray::Float32(v) => v.iter().map(|e| Value::F32(*e)).collect(),
        TypedArray::Float64(v) => v.iter().map(|e| Value::F64(*e)).collect(),
    }
}

impl<'a> ValueSerializer<'a> {
    pub fn new(options: &'a MappingOptions) -> Self {
        Self { options }
    }

    pub fn serialize(&self, value: &HostValue, typ: &AnalysedType) -> Result<Value, MappingError> {
        self.serialize_with_path(value, typ, "")
    }

    pub(crate) fn serialize_with_path(
        &self,
        value: &HostValue,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        match typ {
            AnalysedType::Bool => match value {
                HostValue::Bool(b) => Ok(Value::Bool(*b)),
                _ => Err(type_mismatch(typ, value, path)),
            },
            AnalysedType::S8
            | AnalysedType::S16
            | AnalysedType::S32
            | AnalysedType::S64
            | AnalysedType::U8
            | AnalysedType::U16
            | AnalysedType::U32
            | AnalysedType::U64 => Self::serialize_integer(value, typ, path),
            AnalysedType::F32 | AnalysedType::F64 => match value {
                HostValue::Number(n) if matches!(typ, AnalysedType::F32) => {
                    Ok(Value::F32(n.as_f64() as f32))
                }
                HostValue::Number(n) => Ok(Value::F64(n.as_f64())),
                _ => Err(type_mismatch(typ, value, path)),
            },
            AnalysedType::Chr => match value {
                HostValue::String(s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Ok(Value::Char(c)),
                        _ => Err(MappingError::TypeMismatch {
                            expected: "char".to_string(),
                            actual: format!("string of length {}", s.chars().count()),
                            path: path.to_string(),
                        }),
                    }
                }
                _ => Err(type_mismatch(typ, value, path)),
            },
            AnalysedType::Str => match value {
                HostValue::String(s) => Ok(Value::String(s.to_string())),
                _ => Err(type_mismatch(typ, value, path)),
            },
            AnalysedType::List(list) => self.serialize_list(value, list, typ, path),
            AnalysedType::Option(option) => {
                if value.is_nullish() {
                    Ok(Value::none())
                } else {
                    Ok(Value::some(self.serialize_with_path(
                        value,
                        &option.inner,
                        path,
                    )?))
                }
            }
            AnalysedType::Tuple(tuple) => self.serialize_tuple(value, tuple, typ, path),
            AnalysedType::Record(record) => self.serialize_record(value, record, typ, path),
            AnalysedType::Variant(variant) => match &variant.tagging {
                VariantTagging::Untagged => self.serialize_untagged(value, variant, typ, path),
                VariantTagging::Tagged { tag_field } => {
                    self.serialize_tagged(value, variant, tag_field, typ, path)
                }
            },
            AnalysedType::Result(result) => self.serialize_result(value, result, typ, path),
            AnalysedType::Enum(e) => Self::serialize_enum(value, e, typ, path),
            AnalysedType::Flags(flags) => Self::serialize_flags(value, flags, typ, path),
            AnalysedType::Handle(_) => Err(MappingError::Unsupported {
                typ: typ.to_string(),
                path: path.to_string(),
            }),
        }
    }

    fn serialize_integer(
        value: &HostValue,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        let n = match value {
            HostValue::Number(n) => match n.as_i128() {
                Some(n) => n,
                None => {
                    return Err(MappingError::TypeMismatch {
                        expected: typ.describe(),
                        actual: format!("non-integer number {n}"),
                        path: path.to_string(),
                    })
                }
            },
            HostValue::BigInt(b) if typ.is_64bit_integer() => match bigint_to_i128(b) {
                Some(n) => n,
                None => {
                    return Err(MappingError::OutOfRange {
                        value: b.to_string(),
                        expected: typ.kind_name().to_string(),
                        path: path.to_string(),
                    })
                }
            },
            _ => return Err(type_mismatch(typ, value, path)),
        };

        let out_of_range = || MappingError::OutOfRange {
            value: n.to_string(),
            expected: typ.kind_name().to_string(),
            path: path.to_string(),
        };

        Ok(match typ {
            AnalysedType::S8 => Value::S8(i8::try_from(n).map_err(|_| out_of_range())?),
            AnalysedType::S16 => Value::S16(i16::try_from(n).map_err(|_| out_of_range())?),
            AnalysedType::S32 => Value::S32(i32::try_from(n).map_err(|_| out_of_range())?),
            AnalysedType::S64 => Value::S64(i64::try_from(n).map_err(|_| out_of_range())?),
            AnalysedType::U8 => Value::U8(u8::try_from(n).map_err(|_| out_of_range())?),
            AnalysedType::U16 => Value::U16(u16::try_from(n).map_err(|_| out_of_range())?),
            AnalysedType::U32 => Value::U32(u32::try_from(n).map_err(|_| out_of_range())?),
            AnalysedType::U64 => Value::U64(u64::try_from(n).map_err(|_| out_of_range())?),
            _ => return Err(type_mismatch(typ, value, path)),
        })
    }

    fn serialize_elements(
        &self,
        items: &[HostValue],
        inner: &AnalysedType,
        path: &str,
    ) -> Result<Vec<Value>, MappingError> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| self.serialize_with_path(item, inner, &index_path(path, idx)))
            .collect()
    }

    fn serialize_list(
        &self,
        value: &HostValue,
        list: &TypeList,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        match (&list.encoding, value) {
            (ListEncoding::TypedArray(kind), HostValue::TypedArray(array)) => {
                if array.kind() == *kind {
                    Ok(Value::List(typed_array_values(array)))
                } else {
                    Err(MappingError::TypeMismatch {
                        expected: kind.host_name().to_string(),
                        actual: array.kind().host_name().to_string(),
                        path: path.to_string(),
                    })
                }
            }
            (ListEncoding::Map, HostValue::Map(entries)) => {
                let (key_type, value_type) = match list.inner.as_ref() {
                    AnalysedType::Tuple(t) if t.items.len() == 2 => (&t.items[0], &t.items[1]),
                    _ => {
                        return Err(MappingError::Unsupported {
                            typ: typ.to_string(),
                            path: path.to_string(),
                        })
                    }
                };
                let mut out = Vec::with_capacity(entries.len());
                for (idx, (k, v)) in entries.iter().enumerate() {
                    let entry_path = index_path(path, idx);
                    out.push(Value::Tuple(vec![
                        self.serialize_with_path(k, key_type, &index_path(&entry_path, 0))?,
                        self.serialize_with_path(v, value_type, &index_path(&entry_path, 1))?,
                    ]));
                }
                Ok(Value::List(out))
            }
            (_, HostValue::Array(items)) => {
                Ok(Value::List(self.serialize_elements(items, &list.inner, path)?))
            }
            (_, HostValue::TypedArray(array)) => Ok(Value::List(self.serialize_elements(
                &array.elements(),
                &list.inner,
                path,
            )?)),
            _ => Err(type_mismatch(typ, value, path)),
        }
    }

    fn serialize_tuple(
        &self,
        value: &HostValue,
        tuple: &TypeTuple,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        if tuple.items.is_empty() && value.is_nullish() {
            return Ok(Value::Tuple(vec![]));
        }
        let HostValue::Array(items) = value else {
            return Err(type_mismatch(typ, value, path));
        };
        if items.len() != tuple.items.len() {
            return Err(MappingError::ArityMismatch {
                expected: tuple.items.len(),
                actual: items.len(),
                path: path.to_string(),
            });
        }
        let values = items
            .iter()
            .zip(tuple.items.iter())
            .enumerate()
            .map(|(idx, (item, item_type))| {
                self.serialize_with_path(item, item_type, &index_path(path, idx))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Tuple(values))
    }

    fn serialize_record(
        &self,
        value: &HostValue,
        record: &TypeRecord,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        if !matches!(value, HostValue::Object(_)) {
            return Err(type_mismatch(typ, value, path));
        }

        let mut fields = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let field_value = match value.field(&field.name) {
                Some(v) => self.serialize_with_path(v, &field.typ, &field_path(path, &field.name))?,
                None if field.typ.is_option() => Value::none(),
                None => match falsy_default(&field.typ) {
                    Some(default) if self.options.falsy_defaults => default,
                    _ => {
                        return Err(MappingError::MissingField {
                            field: field.name.clone(),
                            path: path.to_string(),
                        })
                    }
                },
            };
            fields.push(field_value);
        }
        Ok(Value::Record(fields))
    }

    fn serialize_untagged(
        &self,
        value: &HostValue,
        variant: &TypeVariant,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        for (idx, case) in variant.cases.iter().enumerate() {
            let case_idx = idx as u32;
            match &case.typ {
                None => {
                    if let HostValue::String(s) = value {
                        if case.name.as_str() == &**s {
                            return Ok(Value::variant(case_idx, None));
                        }
                    }
                }
                Some(case_type) => {
                    if matches_type(value, case_type) {
                        trace!("value at '{path}' selects case {}", case.name);
                        let payload = self.serialize_with_path(value, case_type, path)?;
                        return Ok(Value::variant(case_idx, Some(payload)));
                    }
                }
            }
        }
        Err(MappingError::NoUnionMatch {
            value: value.render(),
            expected: typ.describe(),
            path: path.to_string(),
        })
    }

    fn serialize_tagged(
        &self,
        value: &HostValue,
        variant: &TypeVariant,
        tag_field: &str,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        if !matches!(value, HostValue::Object(_)) {
            return Err(type_mismatch(typ, value, path));
        }
        let Some(HostValue::String(tag)) = value.field(tag_field) else {
            return Err(MappingError::MissingTag {
                tag_field: tag_field.to_string(),
                path: path.to_string(),
            });
        };
        let Some((idx, case)) = variant
            .cases
            .iter()
            .enumerate()
            .find(|(_, c)| c.name.as_str() == &**tag)
        else {
            return Err(MappingError::UnknownTag {
                tag: tag.to_string(),
                allowed: variant.cases.iter().map(|c| c.name.clone()).collect(),
                path: path.to_string(),
            });
        };

        let payload = match &case.typ {
            None => None,
            Some(case_type) => {
                let payload_field = case.payload_field.as_deref().unwrap_or("val");
                Some(self.serialize_payload(value, case_type, payload_field, path)?)
            }
        };
        Ok(Value::variant(idx as u32, payload))
    }

    fn serialize_payload(
        &self,
        value: &HostValue,
        typ: &AnalysedType,
        field: &str,
        path: &str,
    ) -> Result<Value, MappingError> {
        match value.field(field) {
            Some(payload) => self.serialize_with_path(payload, typ, &field_path(path, field)),
            None if typ.is_option() => Ok(Value::none()),
            None => Err(MappingError::MissingField {
                field: field.to_string(),
                path: path.to_string(),
            }),
        }
    }

    fn serialize_result(
        &self,
        value: &HostValue,
        result: &TypeResult,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        if !matches!(value, HostValue::Object(_)) {
            return Err(type_mismatch(typ, value, path));
        }
        let Some(HostValue::String(tag)) = value.field("tag") else {
            return Err(MappingError::MissingTag {
                tag_field: "tag".to_string(),
                path: path.to_string(),
            });
        };

        let payload = |payload_type: &Option<Box<AnalysedType>>, field: &str| match payload_type {
            None => Ok(None),
            Some(t) => self
                .serialize_payload(value, t, field, path)
                .map(|v| Some(Box::new(v))),
        };

        match &**tag {
            "ok" => Ok(Value::Result(Ok(payload(&result.ok, &result.shape.ok_field)?))),
            "err" => Ok(Value::Result(Err(payload(
                &result.err,
                &result.shape.err_field,
            )?))),
            other => Err(MappingError::UnknownTag {
                tag: other.to_string(),
                allowed: vec!["ok".to_string(), "err".to_string()],
                path: path.to_string(),
            }),
        }
    }

    fn serialize_enum(
        value: &HostValue,
        e: &TypeEnum,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        let HostValue::String(s) = value else {
            return Err(type_mismatch(typ, value, path));
        };
        match e.cases.iter().position(|c| c.as_str() == &**s) {
            Some(idx) => Ok(Value::Enum(idx as u32)),
            None => Err(MappingError::InvalidEnumValue {
                value: s.to_string(),
                allowed: e.cases.clone(),
                path: path.to_string(),
            }),
        }
    }

    /// Flags are an object of booleans or an array of the names that are set.
    fn serialize_flags(
        value: &HostValue,
        flags: &TypeFlags,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<Value, MappingError> {
        match value {
            HostValue::Object(_) => {
                let mut bits = Vec::with_capacity(flags.names.len());
                for name in &flags.names {
                    bits.push(match value.field(name) {
                        None => false,
                        Some(HostValue::Bool(b)) => *b,
                        Some(other) => {
                            return Err(type_mismatch(
                                &AnalysedType::Bool,
                                other,
                                &field_path(path, name),
                            ))
                        }
                    });
                }
                Ok(Value::Flags(bits))
            }
            HostValue::Array(items) => {
                let mut bits = vec![false; flags.names.len()];
                for (idx, item) in items.iter().enumerate() {
                    let position = match item {
                        HostValue::String(s) => flags.names.iter().position(|n| n.as_str() == &**s),
                        _ => None,
                    };
                    match position {
                        Some(p) => bits[p] = true,
                        None => {
                            return Err(MappingError::InvalidEnumValue {
                                value: item.render(),
                                allowed: flags.names.clone(),
                                path: index_path(path, idx),
                            })
                        }
                    }
                }
                Ok(Value::Flags(bits))
            }
            _ => Err(type_mismatch(typ, value, path)),
        }
    }
}
