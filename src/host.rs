// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::{format_bigint, Number};
use crate::Rc;

use core::fmt;
use std::ops;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use num_bigint::BigInt;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// A dynamic value as seen by agent code.
///
/// Objects keep their insertion order, which is the order in which the
/// deserializer writes record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    // Json data types. serde will automatically map json to these variants.
    Null,
    Bool(bool),
    Number(Number),
    String(Rc<str>),
    Array(Rc<Vec<HostValue>>),
    Object(Rc<IndexMap<Rc<str>, HostValue>>),

    // Host types without a json spelling.
    BigInt(Rc<BigInt>),
    TypedArray(Rc<TypedArray>),
    Map(Rc<Vec<(HostValue, HostValue)>>),

    // Indicate that a value is undefined
    Undefined,
}

/// Element kind of a typed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypedArrayKind {
    Uint8,
    Uint16,
    Uint32,
    BigUint64,
    Int8,
    Int16,
    Int32,
    BigInt64,
    Float32,
    Float64,
}

impl TypedArrayKind {
    pub fn host_name(&self) -> &'static str {
        match self {
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
        }
    }

    pub fn from_host_name(name: &str) -> Option<TypedArrayKind> {
        Some(match name {
            "Uint8Array" => TypedArrayKind::Uint8,
            "Uint16Array" => TypedArrayKind::Uint16,
            "Uint32Array" => TypedArrayKind::Uint32,
            "BigUint64Array" => TypedArrayKind::BigUint64,
            "Int8Array" => TypedArrayKind::Int8,
            "Int16Array" => TypedArrayKind::Int16,
            "Int32Array" => TypedArrayKind::Int32,
            "BigInt64Array" => TypedArrayKind::BigInt64,
            "Float32Array" => TypedArrayKind::Float32,
            "Float64Array" => TypedArrayKind::Float64,
            _ => return None,
        })
    }
}

/// A fixed-width numeric array.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    BigUint64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    BigInt64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl TypedArray {
    pub fn kind(&self) -> TypedArrayKind {
        match self {
            TypedArray::Uint8(_) => TypedArrayKind::Uint8,
            TypedArray::Uint16(_) => TypedArrayKind::Uint16,
            TypedArray::Uint32(_) => TypedArrayKind::Uint32,
            TypedArray::BigUint64(_) => TypedArrayKind::BigUint64,
            TypedArray::Int8(_) => TypedArrayKind::Int8,
            TypedArray::Int16(_) => TypedArrayKind::Int16,
            TypedArray::Int32(_) => TypedArrayKind::Int32,
            TypedArray::BigInt64(_) => TypedArrayKind::BigInt64,
            TypedArray::Float32(_) => TypedArrayKind::Float32,
            TypedArray::Float64(_) => TypedArrayKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::Uint8(v) => v.len(),
            TypedArray::Uint16(v) => v.len(),
            TypedArray::Uint32(v) => v.len(),
            TypedArray::BigUint64(v) => v.len(),
            TypedArray::Int8(v) => v.len(),
            TypedArray::Int16(v) => v.len(),
            TypedArray::Int32(v) => v.len(),
            TypedArray::BigInt64(v) => v.len(),
            TypedArray::Float32(v) => v.len(),
            TypedArray::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements as individual host values. 64-bit kinds yield bigints.
    pub fn elements(&self) -> Vec<HostValue> {
        match self {
            TypedArray::Uint8(v) => v.iter().map(|e| HostValue::from(u64::from(*e))).collect(),
            TypedArray::Uint16(v) => v.iter().map(|e| HostValue::from(u64::from(*e))).collect(),
            TypedArray::Uint32(v) => v.iter().map(|e| HostValue::from(u64::from(*e))).collect(),
            TypedArray::BigUint64(v) => v.iter().map(|e| HostValue::from(BigInt::from(*e))).collect(),
            TypedArray::Int8(v) => v.iter().map(|e| HostValue::from(i64::from(*e))).collect(),
            TypedArray::Int16(v) => v.iter().map(|e| HostValue::from(i64::from(*e))).collect(),
            TypedArray::Int32(v) => v.iter().map(|e| HostValue::from(i64::from(*e))).collect(),
            TypedArray::BigInt64(v) => v.iter().map(|e| HostValue::from(BigInt::from(*e))).collect(),
            TypedArray::Float32(v) => v.iter().map(|e| HostValue::from(f64::from(*e))).collect(),
            TypedArray::Float64(v) => v.iter().map(|e| HostValue::from(*e)).collect(),
        }
    }
}

impl Serialize for HostValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            HostValue::Null => serializer.serialize_none(),
            HostValue::Bool(b) => serializer.serialize_bool(*b),
            HostValue::String(s) => serializer.serialize_str(s.as_ref()),
            HostValue::Number(n) => n.serialize(serializer),
            HostValue::Array(a) => a.serialize(serializer),
            HostValue::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    map.serialize_entry(k.as_ref(), v)?;
                }
                map.end()
            }

            // display bigints the way they are written in source
            HostValue::BigInt(b) => serializer.serialize_str(&format_bigint(b)),

            // display typed arrays as plain arrays
            HostValue::TypedArray(t) => t.elements().serialize(serializer),

            // display maps as an array of entries
            HostValue::Map(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for (k, v) in entries.iter() {
                    seq.serialize_element(&[k, v])?;
                }
                seq.end()
            }

            // display undefined as a special string
            HostValue::Undefined => serializer.serialize_str("<undefined>"),
        }
    }
}

struct HostValueVisitor;

impl<'de> Visitor<'de> for HostValueVisitor {
    type Value = HostValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(HostValue::Null)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(HostValue::Bool(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(HostValue::from(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(HostValue::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(HostValue::from(v))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(HostValue::from(s))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(HostValue::String(s.into()))
    }

    fn visit_seq<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut arr = vec![];
        while let Some(v) = visitor.next_element()? {
            arr.push(v);
        }
        Ok(HostValue::from(arr))
    }

    fn visit_map<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut map = IndexMap::new();
        while let Some((key, value)) = visitor.next_entry::<String, HostValue>()? {
            if key == "$serde_json::private::Number" {
                if let HostValue::String(s) = &value {
                    return match Number::from_str(s) {
                        Ok(n) => Ok(HostValue::from(n)),
                        _ => Err(de::Error::custom("failed to read big number")),
                    };
                }
            }
            map.insert(Rc::from(key.as_str()), value);
        }
        Ok(HostValue::from(map))
    }
}

impl<'de> Deserialize<'de> for HostValue {
    fn deserialize<D>(deserializer: D) -> Result<HostValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(HostValueVisitor)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{s}"),
            Err(_e) => Err(std::fmt::Error),
        }
    }
}

impl HostValue {
    pub fn new_object() -> HostValue {
        HostValue::from(IndexMap::new())
    }

    pub fn new_array() -> HostValue {
        HostValue::from(vec![])
    }

    pub fn from_json_str(json: &str) -> Result<HostValue> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compact rendering used in error messages.
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// Builds an object from `(key, value)` pairs, preserving their order.
    pub fn object<K, I>(entries: I) -> HostValue
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, HostValue)>,
    {
        HostValue::from(
            entries
                .into_iter()
                .map(|(k, v)| (Rc::from(k.as_ref()), v))
                .collect::<IndexMap<_, _>>(),
        )
    }

    pub fn from_map_entries(entries: Vec<(HostValue, HostValue)>) -> HostValue {
        HostValue::Map(Rc::new(entries))
    }

    /// Short name of the host type of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Array(_) => "array",
            HostValue::Object(_) => "object",
            HostValue::BigInt(_) => "bigint",
            HostValue::TypedArray(t) => t.kind().host_name(),
            HostValue::Map(_) => "Map",
            HostValue::Undefined => "undefined",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    /// `null` and `undefined` both denote an absent optional value.
    pub fn is_nullish(&self) -> bool {
        matches!(self, HostValue::Null | HostValue::Undefined)
    }

    pub fn as_bool(&self) -> Result<&bool> {
        match self {
            HostValue::Bool(b) => Ok(b),
            _ => Err(anyhow!("not a bool")),
        }
    }

    pub fn as_string(&self) -> Result<&Rc<str>> {
        match self {
            HostValue::String(s) => Ok(s),
            _ => Err(anyhow!("not a string")),
        }
    }

    pub fn as_number(&self) -> Result<&Number> {
        match self {
            HostValue::Number(n) => Ok(n),
            _ => Err(anyhow!("not a number")),
        }
    }

    pub fn as_bigint(&self) -> Result<&BigInt> {
        match self {
            HostValue::BigInt(b) => Ok(b),
            _ => Err(anyhow!("not a bigint")),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<HostValue>> {
        match self {
            HostValue::Array(a) => Ok(a),
            _ => Err(anyhow!("not an array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<HostValue>> {
        match self {
            HostValue::Array(a) => Ok(Rc::make_mut(a)),
            _ => Err(anyhow!("not an array")),
        }
    }

    pub fn as_typed_array(&self) -> Result<&TypedArray> {
        match self {
            HostValue::TypedArray(t) => Ok(t),
            _ => Err(anyhow!("not a typed array")),
        }
    }

    pub fn as_map(&self) -> Result<&Vec<(HostValue, HostValue)>> {
        match self {
            HostValue::Map(m) => Ok(m),
            _ => Err(anyhow!("not a map")),
        }
    }

    pub fn as_object(&self) -> Result<&IndexMap<Rc<str>, HostValue>> {
        match self {
            HostValue::Object(m) => Ok(m),
            _ => Err(anyhow!("not an object")),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut IndexMap<Rc<str>, HostValue>> {
        match self {
            HostValue::Object(m) => Ok(Rc::make_mut(m)),
            _ => Err(anyhow!("not an object")),
        }
    }

    /// Field lookup that treats a missing key like an explicit `undefined`.
    pub fn field(&self, key: &str) -> Option<&HostValue> {
        match self {
            HostValue::Object(o) => o.get(key).filter(|v| !v.is_undefined()),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.into())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s.into())
    }
}

impl From<u64> for HostValue {
    fn from(n: u64) -> Self {
        HostValue::Number(Number::from(n))
    }
}

impl From<u32> for HostValue {
    fn from(n: u32) -> Self {
        HostValue::Number(Number::from(n))
    }
}

impl From<i64> for HostValue {
    fn from(n: i64) -> Self {
        HostValue::Number(Number::from(n))
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        HostValue::Number(Number::from(n))
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        HostValue::Number(Number::from(n))
    }
}

impl From<usize> for HostValue {
    fn from(n: usize) -> Self {
        HostValue::Number(Number::from(n))
    }
}

impl From<Number> for HostValue {
    fn from(n: Number) -> Self {
        HostValue::Number(n)
    }
}

impl From<BigInt> for HostValue {
    fn from(n: BigInt) -> Self {
        HostValue::BigInt(Rc::new(n))
    }
}

impl From<TypedArray> for HostValue {
    fn from(t: TypedArray) -> Self {
        HostValue::TypedArray(Rc::new(t))
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(a: Vec<HostValue>) -> Self {
        HostValue::Array(Rc::new(a))
    }
}

impl From<IndexMap<Rc<str>, HostValue>> for HostValue {
    fn from(m: IndexMap<Rc<str>, HostValue>) -> Self {
        HostValue::Object(Rc::new(m))
    }
}

impl ops::Index<usize> for HostValue {
    type Output = HostValue;

    fn index(&self, index: usize) -> &Self::Output {
        match self.as_array() {
            Ok(a) if index < a.len() => &a[index],
            _ => &HostValue::Undefined,
        }
    }
}

impl ops::Index<&str> for HostValue {
    type Output = HostValue;

    fn index(&self, key: &str) -> &Self::Output {
        match self {
            HostValue::Object(o) => match o.get(key) {
                Some(v) => v,
                _ => &HostValue::Undefined,
            },
            _ => &HostValue::Undefined,
        }
    }
}
