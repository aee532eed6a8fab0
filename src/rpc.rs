// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Outbound calls to other agents.
//!
//! The transport itself lives outside this crate. [`RemoteClient`] maps
//! native arguments through the schemas of the target class and hands the
//! resulting [`DataValue`] to an [`RpcTransport`].

use core::fmt;
use core::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::agent::{MethodSchema, SchemaStore};
use crate::data::{DataAdapter, DataValue};
use crate::host::HostValue;
use crate::invoke::AgentError;
use crate::mapping::MappingError;
use crate::Rc;

/// Identity of a remote agent: its type and constructor arguments, written
/// `agent-type(args)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentId {
    pub agent_type: String,
    pub parameters: String,
}

impl AgentId {
    pub fn new(agent_type: &str, parameters: &str) -> AgentId {
        AgentId {
            agent_type: agent_type.to_string(),
            parameters: parameters.to_string(),
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.agent_type, self.parameters)
    }
}

impl FromStr for AgentId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<AgentId, AgentError> {
        let invalid = || AgentError::InvalidAgentId(s.to_string());
        let (agent_type, rest) = s.split_once('(').ok_or_else(invalid)?;
        let parameters = rest.strip_suffix(')').ok_or_else(invalid)?;
        if agent_type.trim().is_empty() || agent_type.contains(')') {
            return Err(invalid());
        }
        Ok(AgentId::new(agent_type, parameters))
    }
}

/// Point in time since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduledTime {
    pub seconds: u64,
    pub nanoseconds: u32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Remote agent failed: {0}")]
    Remote(AgentError),

    #[error("Remote agent not found: {0}")]
    NotFound(AgentId),
}

/// Sends serialized calls to remote agents.
pub trait RpcTransport {
    fn invoke_and_await(
        &self,
        target: &AgentId,
        function: &str,
        input: DataValue,
    ) -> Result<DataValue, RpcError>;

    /// Fire-and-forget: returns once the call is enqueued.
    fn invoke(&self, target: &AgentId, function: &str, input: DataValue) -> Result<(), RpcError>;

    fn schedule_invocation(
        &self,
        target: &AgentId,
        function: &str,
        input: DataValue,
        at: ScheduledTime,
    ) -> Result<(), RpcError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Agent type '{0}' is not registered")]
    UnknownAgentType(String),

    #[error("Agent '{class_name}' has no method '{method}'")]
    UnknownMethod { class_name: String, method: String },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Calls the methods of one remote agent through a static dispatch table.
pub struct RemoteClient<T: RpcTransport> {
    store: Rc<SchemaStore>,
    class_name: String,
    target: AgentId,
    transport: T,
}

impl<T: RpcTransport> fmt::Debug for RemoteClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClient")
            .field("class_name", &self.class_name)
            .field("target", &self.target)
            .finish()
    }
}

impl<T: RpcTransport> RemoteClient<T> {
    pub fn new(
        store: Rc<SchemaStore>,
        class_name: &str,
        target: AgentId,
        transport: T,
    ) -> Result<Self, ClientError> {
        if store.agent_type(class_name).is_none() {
            return Err(ClientError::UnknownAgentType(class_name.to_string()));
        }
        Ok(Self {
            store,
            class_name: class_name.to_string(),
            target,
            transport,
        })
    }

    pub fn target(&self) -> &AgentId {
        &self.target
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn prepare(
        &self,
        method: &str,
        args: &[HostValue],
    ) -> Result<(Rc<MethodSchema>, DataValue), ClientError> {
        let schema = self.store.method(&self.class_name, method).ok_or_else(|| {
            ClientError::UnknownMethod {
                class_name: self.class_name.clone(),
                method: method.to_string(),
            }
        })?;
        let input =
            DataAdapter::new(self.store.options()).serialize_parameters(args, &schema.params)?;
        debug!("calling {} on {}", schema.wire_name, self.target);
        Ok((schema, input))
    }

    /// Calls a method and waits for its result.
    pub fn call(&self, method: &str, args: &[HostValue]) -> Result<HostValue, ClientError> {
        let (schema, input) = self.prepare(method, args)?;
        let output = self
            .transport
            .invoke_and_await(&self.target, &schema.wire_name, input)?;
        Ok(DataAdapter::new(self.store.options())
            .deserialize_return(&output, schema.return_info())?)
    }

    /// Calls a method without waiting for it to run.
    pub fn trigger(&self, method: &str, args: &[HostValue]) -> Result<(), ClientError> {
        let (schema, input) = self.prepare(method, args)?;
        Ok(self
            .transport
            .invoke(&self.target, &schema.wire_name, input)?)
    }

    /// Calls a method at a later time.
    pub fn schedule(
        &self,
        method: &str,
        args: &[HostValue],
        at: ScheduledTime,
    ) -> Result<(), ClientError> {
        let (schema, input) = self.prepare(method, args)?;
        Ok(self
            .transport
            .schedule_invocation(&self.target, &schema.wire_name, input, at)?)
    }
}

#[cfg(test)]
mod tests {
    mod client;
}
