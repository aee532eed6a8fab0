// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch, clippy::as_conversions)]

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::analysed::{
    AnalysedType, ListEncoding, TypeList, TypeResult, TypeVariant, VariantTagging,
};
use crate::host::{HostValue, TypedArray, TypedArrayKind};
use crate::mapping::{field_path, index_path, MappingError};
use crate::options::MappingOptions;
use crate::value::Value;
use crate::Rc;

/// Converts wire values back into host values.
///
/// A wire value that does not fit its type is an internal defect and is
/// reported as [`MappingError::Malformed`].
#[derive(Debug, Clone, Copy)]
pub struct ValueDeserializer<'a> {
    options: &'a MappingOptions,
}

fn malformed(typ: &AnalysedType, value: &Value, path: &str) -> MappingError {
    MappingError::Malformed {
        expected: typ.describe(),
        actual: value.kind_name().to_string(),
        path: path.to_string(),
    }
}

macro_rules! typed_elements {
    ($items:expr, $variant:ident, $expected:literal, $path:expr) => {
        $items
            .iter()
            .enumerate()
            .map(|(idx, v)| match v {
                Value::$variant(x) => Ok(*x),
                other => Err(MappingError::Malformed {
                    expected: $expected.to_string(),
                    actual: other.kind_name().to_string(),
                    path: index_path($path, idx),
                }),
            })
            .collect::<Result<Vec<_>, MappingError>>()?
    };
}

impl<'a> ValueDeserializer<'a> {
    pub fn new(options: &'a MappingOptions) -> Self {
        Self { options }
    }

    pub fn deserialize(&self, value: &Value, typ: &AnalysedType) -> Result<HostValue, MappingError> {
        self.deserialize_with_path(value, typ, "")
    }

    fn wide_integer(&self, n: i128) -> HostValue {
        if self.options.bigint_for_64bit {
            HostValue::from(BigInt::from(n))
        } else {
            HostValue::from(n as f64)
        }
    }

    pub(crate) fn deserialize_with_path(
        &self,
        value: &Value,
        typ: &AnalysedType,
        path: &str,
    ) -> Result<HostValue, MappingError> {
        Ok(match (typ, value) {
            (AnalysedType::Bool, Value::Bool(b)) => HostValue::Bool(*b),
            (AnalysedType::U8, Value::U8(v)) => HostValue::from(u64::from(*v)),
            (AnalysedType::U16, Value::U16(v)) => HostValue::from(u64::from(*v)),
            (AnalysedType::U32, Value::U32(v)) => HostValue::from(u64::from(*v)),
            (AnalysedType::U64, Value::U64(v)) => self.wide_integer(i128::from(*v)),
            (AnalysedType::S8, Value::S8(v)) => HostValue::from(i64::from(*v)),
            (AnalysedType::S16, Value::S16(v)) => HostValue::from(i64::from(*v)),
            (AnalysedType::S32, Value::S32(v)) => HostValue::from(i64::from(*v)),
            (AnalysedType::S64, Value::S64(v)) => self.wide_integer(i128::from(*v)),
            (AnalysedType::F32, Value::F32(v)) => HostValue::from(f64::from(*v)),
            (AnalysedType::F64, Value::F64(v)) => HostValue::from(*v),
            (AnalysedType::Chr, Value::Char(c)) => HostValue::from(c.to_string()),
            (AnalysedType::Str, Value::String(s)) => HostValue::from(s.as_str()),
            (AnalysedType::List(list), Value::List(items)) => {
                self.deserialize_list(items, list, path)?
            }
            (AnalysedType::Option(option), Value::Option(inner)) => match inner {
                None => HostValue::Undefined,
                Some(v) => self.deserialize_with_path(v, &option.inner, path)?,
            },
            (AnalysedType::Tuple(tuple), Value::Tuple(items)) => {
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
                        self.deserialize_with_path(item, item_type, &index_path(path, idx))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                HostValue::from(values)
            }
            (AnalysedType::Record(record), Value::Record(fields)) => {
                if fields.len() != record.fields.len() {
                    return Err(MappingError::ArityMismatch {
                        expected: record.fields.len(),
                        actual: fields.len(),
                        path: path.to_string(),
                    });
                }
                let mut object = IndexMap::with_capacity(fields.len());
                for (field, field_value) in record.fields.iter().zip(fields.iter()) {
                    let host = self.deserialize_with_path(
                        field_value,
                        &field.typ,
                        &field_path(path, &field.name),
                    )?;
                    // Absent optional fields are omitted rather than set to undefined.
                    if !host.is_undefined() {
                        object.insert(Rc::from(field.name.as_str()), host);
                    }
                }
                HostValue::from(object)
            }
            (
                AnalysedType::Variant(variant),
                Value::Variant {
                    case_idx,
                    case_value,
                },
            ) => self.deserialize_variant(variant, *case_idx, case_value, typ, value, path)?,
            (AnalysedType::Result(result), Value::Result(res)) => {
                self.deserialize_result(result, res, typ, value, path)?
            }
            (AnalysedType::Enum(e), Value::Enum(idx)) => match e.cases.get(*idx as usize) {
                Some(name) => HostValue::from(name.as_str()),
                None => {
                    return Err(MappingError::Malformed {
                        expected: format!("enum case index below {}", e.cases.len()),
                        actual: format!("case index {idx}"),
                        path: path.to_string(),
                    })
                }
            },
            (AnalysedType::Flags(flags), Value::Flags(bits)) => {
                if bits.len() != flags.names.len() {
                    return Err(MappingError::ArityMismatch {
                        expected: flags.names.len(),
                        actual: bits.len(),
                        path: path.to_string(),
                    });
                }
                HostValue::object(
                    flags
                        .names
                        .iter()
                        .zip(bits.iter())
                        .map(|(name, bit)| (name.as_str(), HostValue::Bool(*bit))),
                )
            }
            (AnalysedType::Handle(_), _) => {
                return Err(MappingError::Unsupported {
                    typ: typ.to_string(),
                    path: path.to_string(),
                })
            }
            _ => return Err(malformed(typ, value, path)),
        })
    }

    fn deserialize_list(
        &self,
        items: &[Value],
        list: &TypeList,
        path: &str,
    ) -> Result<HostValue, MappingError> {
        match &list.encoding {
            ListEncoding::TypedArray(kind) => {
                let array = match kind {
                    TypedArrayKind::Uint8 => TypedArray::Uint8(typed_elements!(items, U8, "u8", path)),
                    TypedArrayKind::Uint16 => {
                        TypedArray::Uint16(typed_elements!(items, U16, "u16", path))
                    }
                    TypedArrayKind::Uint32 => {
                        TypedArray::Uint32(typed_elements!(items, U32, "u32", path))
                    }
                    TypedArrayKind::BigUint64 => {
                        TypedArray::BigUint64(typed_elements!(items, U64, "u64", path))
                    }
                    TypedArrayKind::Int8 => TypedArray::Int8(typed_elements!(items, S8, "s8", path)),
                    TypedArrayKind::Int16 => {
                        TypedArray::Int16(typed_elements!(items, S16, "s16", path))
                    }
                    TypedArrayKind::Int32 => {
                        TypedArray::Int32(typed_elements!(items, S32, "s32", path))
                    }
                    TypedArrayKind::BigInt64 => {
                        TypedArray::BigInt64(typed_elements!(items, S64, "s64", path))
                    }
                    TypedArrayKind::Float32 => {
                        TypedArray::Float32(typed_elements!(items, F32, "f32", path))
                    }
                    TypedArrayKind::Float64 => {
                        TypedArray::Float64(typed_elements!(items, F64, "f64", path))
                    }
                };
                Ok(HostValue::from(array))
            }
            ListEncoding::Map => {
                let AnalysedType::Tuple(entry_type) = list.inner.as_ref() else {
                    return Err(MappingError::Unsupported {
                        typ: list.inner.to_string(),
                        path: path.to_string(),
                    });
                };
                let (key_type, value_type) = match entry_type.items.as_slice() {
                    [k, v] => (k, v),
                    _ => {
                        return Err(MappingError::Unsupported {
                            typ: list.inner.to_string(),
                            path: path.to_string(),
                        })
                    }
                };
                let mut entries = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let entry_path = index_path(path, idx);
                    let Value::Tuple(pair) = item else {
                        return Err(malformed(&list.inner, item, &entry_path));
                    };
                    let [k, v] = pair.as_slice() else {
                        return Err(MappingError::ArityMismatch {
                            expected: 2,
                            actual: pair.len(),
                            path: entry_path,
                        });
                    };
                    entries.push((
                        self.deserialize_with_path(k, key_type, &index_path(&entry_path, 0))?,
                        self.deserialize_with_path(v, value_type, &index_path(&entry_path, 1))?,
                    ));
                }
                Ok(HostValue::from_map_entries(entries))
            }
            ListEncoding::Sequence => {
                let values = items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        self.deserialize_with_path(item, &list.inner, &index_path(path, idx))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(HostValue::from(values))
            }
        }
    }

    fn deserialize_variant(
        &self,
        variant: &TypeVariant,
        case_idx: u32,
        case_value: &Option<Box<Value>>,
        typ: &AnalysedType,
        value: &Value,
        path: &str,
    ) -> Result<HostValue, MappingError> {
        let Some(case) = variant.cases.get(case_idx as usize) else {
            return Err(MappingError::Malformed {
                expected: format!("variant case index below {}", variant.cases.len()),
                actual: format!("case index {case_idx}"),
                path: path.to_string(),
            });
        };

        let payload = match (&case.typ, case_value) {
            (None, None) => None,
            (Some(t), Some(v)) => Some(self.deserialize_with_path(v, t, path)?),
            _ => return Err(malformed(typ, value, path)),
        };

        Ok(match (&variant.tagging, payload) {
            (VariantTagging::Untagged, None) => HostValue::from(case.name.as_str()),
            (VariantTagging::Untagged, Some(payload)) => payload,
            (VariantTagging::Tagged { tag_field }, payload) => {
                let mut object = IndexMap::new();
                object.insert(
                    Rc::from(tag_field.as_str()),
                    HostValue::from(case.name.as_str()),
                );
                if let Some(payload) = payload {
                    let field = case.payload_field.as_deref().unwrap_or("val");
                    if !payload.is_undefined() {
                        object.insert(Rc::from(field), payload);
                    }
                }
                HostValue::from(object)
            }
        })
    }

    fn deserialize_result(
        &self,
        result: &TypeResult,
        res: &Result<Option<Box<Value>>, Option<Box<Value>>>,
        typ: &AnalysedType,
        value: &Value,
        path: &str,
    ) -> Result<HostValue, MappingError> {
        let (tag, payload_type, payload, field) = match res {
            Ok(payload) => ("ok", &result.ok, payload, &result.shape.ok_field),
            Err(payload) => ("err", &result.err, payload, &result.shape.err_field),
        };

        let mut object = IndexMap::new();
        object.insert(Rc::from("tag"), HostValue::from(tag));
        match (payload_type, payload) {
            (None, None) => (),
            (Some(t), Some(v)) => {
                let host = self.deserialize_with_path(v, t, &field_path(path, field))?;
                if !host.is_undefined() {
                    object.insert(Rc::from(field.as_str()), host);
                }
            }
            _ => return Err(malformed(typ, value, path)),
        }
        Ok(HostValue::from(object))
    }
}
