// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion between host values and component-model values.

pub mod de;
pub mod error;
pub mod matcher;
pub mod ser;

pub use de::ValueDeserializer;
pub use error::MappingError;
pub use matcher::matches_type;
pub use ser::ValueSerializer;

use crate::analysed::AnalysedType;
use crate::host::HostValue;
use crate::options::MappingOptions;
use crate::value::Value;

/// Serializes a host value with default options.
pub fn serialize(value: &HostValue, typ: &AnalysedType) -> Result<Value, MappingError> {
    ValueSerializer::new(&MappingOptions::default()).serialize(value, typ)
}

/// Deserializes a wire value with default options.
pub fn deserialize(value: &Value, typ: &AnalysedType) -> Result<HostValue, MappingError> {
    ValueDeserializer::new(&MappingOptions::default()).deserialize(value, typ)
}

/// Host type and rendering of a value, shortened for error messages.
pub(crate) fn describe_value(value: &HostValue) -> String {
    const LIMIT: usize = 64;
    let rendered = value.render();
    if rendered.chars().count() > LIMIT {
        let prefix: String = rendered.chars().take(LIMIT).collect();
        format!("{} {prefix}...", value.type_name())
    } else {
        format!("{} {rendered}", value.type_name())
    }
}

pub(crate) fn index_path(path: &str, index: usize) -> String {
    if path.is_empty() {
        format!("[{index}]")
    } else {
        format!("{path}[{index}]")
    }
}

pub(crate) fn field_path(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}
