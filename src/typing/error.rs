// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::registry::RegistryError;

/// Errors raised while deriving schemas from host type descriptions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Unsupported type {typ}: {reason}")]
    Unsupported { typ: String, reason: String },

    #[error("'{name}' is a reserved keyword and cannot name a case or tag")]
    ReservedKeyword { name: String },

    #[error("Union has no members besides null and undefined")]
    EmptyUnion,

    #[error("Duplicate tag '{tag}' in union")]
    DuplicateTag { tag: String },

    #[error("Case '{tag}' of a tagged union must carry at most one payload property, found {}", .properties.join(", "))]
    InvalidTaggedCase { tag: String, properties: Vec<String> },

    #[error("Result case '{tag}' must carry at most one payload property, found {}", .properties.join(", "))]
    AmbiguousResult { tag: String, properties: Vec<String> },

    #[error("Cases '{first}' and '{second}' of an untagged union accept overlapping values")]
    AmbiguousUnion { first: String, second: String },

    #[error("Type '{name}' refers to itself")]
    RecursiveType { name: String },

    #[error("Unknown type '{name}'")]
    UnknownReference { name: String },

    #[error("{typ} is only supported as a top-level parameter or return type, not {position}")]
    SpecialTypePosition { typ: String, position: String },

    #[error("Multimodal parameter '{parameter}' cannot nest another multimodal value")]
    NestedMultimodal { parameter: String },

    #[error("Multimodal parameter '{parameter}' must be the only parameter")]
    MultimodalNotAlone { parameter: String },

    #[error("Invalid multimodal alternative in '{parameter}': {reason}")]
    InvalidAlternative { parameter: String, reason: String },

    #[error("Parameter '{name}' is declared more than once")]
    DuplicateParameter { name: String },

    #[error("Invalid {kind} '{value}' for parameter '{parameter}'")]
    InvalidRestriction {
        parameter: String,
        kind: String,
        value: String,
    },

    #[error("{location}: {error}")]
    Context {
        location: String,
        #[source]
        error: Box<SchemaError>,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl SchemaError {
    /// Prefixes the error with where in an agent class it was found.
    pub fn within(self, location: impl Into<String>) -> SchemaError {
        SchemaError::Context {
            location: location.into(),
            error: Box::new(self),
        }
    }
}
