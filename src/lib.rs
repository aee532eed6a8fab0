// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

#[cfg(feature = "arc")]
pub use std::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub use std::rc::Rc;

pub mod agent;
pub mod analysed;
pub mod data;
pub mod host;
pub mod invoke;
pub mod mapping;
pub mod number;
pub mod options;
pub mod principal;
pub mod registry;
pub mod rpc;
pub mod typing;
pub mod unstructured;
pub mod value;
pub mod wit;

pub use agent::{AgentClassDescription, AgentType, SchemaStore};
pub use analysed::AnalysedType;
pub use data::{DataAdapter, DataSchema, DataValue};
pub use host::HostValue;
pub use invoke::{AgentError, AgentInstance, AgentRuntime};
pub use mapping::{deserialize, serialize, MappingError};
pub use options::MappingOptions;
pub use principal::Principal;
pub use rpc::{RemoteClient, RpcTransport};
pub use typing::{HostType, SchemaError, TypeInfoInternal};
pub use value::Value;
pub use wit::WitValue;
