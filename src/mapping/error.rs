// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::wit::WireError;

/// Errors raised while converting between host values and wire values.
///
/// Paths use `field.sub[3]` notation and are empty at the root.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    /// Host value type does not match the expected type.
    #[error("Type mismatch at '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
        path: String,
    },

    /// Numeric value does not fit the expected width.
    #[error("Value {value} at '{path}' is out of range for {expected}")]
    OutOfRange {
        value: String,
        expected: String,
        path: String,
    },

    /// Required record field is missing.
    #[error("Missing required field '{field}' at '{path}'")]
    MissingField { field: String, path: String },

    /// Tuple value has the wrong number of elements.
    #[error("Expected {expected} elements at '{path}', got {actual}")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        path: String,
    },

    /// Value matches none of the cases of an untagged union.
    #[error("Value {value} at '{path}' does not match any case of {expected}")]
    NoUnionMatch {
        value: String,
        expected: String,
        path: String,
    },

    /// String is not one of the enum literals.
    #[error("Value {value} at '{path}' is not a valid enum value: expected one of {}", .allowed.join(", "))]
    InvalidEnumValue {
        value: String,
        allowed: Vec<String>,
        path: String,
    },

    /// Discriminator property of a tagged value is absent or not a string.
    #[error("Missing tag field '{tag_field}' at '{path}'")]
    MissingTag { tag_field: String, path: String },

    /// Discriminator names no known case.
    #[error("Unknown tag '{tag}' at '{path}': expected one of {}", .allowed.join(", "))]
    UnknownTag {
        tag: String,
        allowed: Vec<String>,
        path: String,
    },

    /// Unstructured value violates the declared language or MIME restrictions.
    #[error("{kind} '{value}' is not allowed: expected one of {}", .allowed.join(", "))]
    RestrictionViolated {
        kind: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Multimodal element fits none of the declared alternatives.
    #[error("Value {value} does not match any multimodal alternative: expected one of {}", .alternatives.join(", "))]
    MultimodalNoMatch {
        value: String,
        alternatives: Vec<String>,
    },

    /// Wire value does not have the shape its type promises.
    #[error("Malformed value at '{path}': expected {expected}, found {actual}")]
    Malformed {
        expected: String,
        actual: String,
        path: String,
    },

    /// Type has no host mapping.
    #[error("Type {typ} at '{path}' is not supported")]
    Unsupported { typ: String, path: String },

    /// Wrong number of arguments for a parameter list.
    #[error("Expected {expected} arguments, got {actual}")]
    ParameterCount { expected: usize, actual: usize },

    /// Data value element does not fit its element schema.
    #[error("Invalid element '{element}': {reason}")]
    InvalidElement { element: String, reason: String },

    /// Failure while mapping a named parameter.
    #[error("Invalid value for parameter '{parameter}': {error}")]
    InParameter {
        parameter: String,
        #[source]
        error: Box<MappingError>,
    },

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl MappingError {
    pub fn in_parameter(self, parameter: &str) -> MappingError {
        MappingError::InParameter {
            parameter: parameter.to_string(),
            error: Box::new(self),
        }
    }
}
