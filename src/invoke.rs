// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Inbound invocation: wire arguments in, native call, wire result out.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentType, SchemaStore};
use crate::data::{DataAdapter, DataValue};
use crate::host::HostValue;
use crate::mapping::MappingError;
use crate::principal::Principal;
use crate::Rc;

/// Structured failure of an invocation. Nothing else crosses the boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// The native result does not fit the declared return type.
    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid agent id: {0}")]
    InvalidAgentId(String),

    /// Raised by the agent code itself.
    #[error("Agent failed: {0}")]
    CustomError(HostValue),
}

impl AgentError {
    fn invalid_input(error: MappingError) -> AgentError {
        AgentError::InvalidInput(error.to_string())
    }

    fn invalid_type(error: MappingError) -> AgentError {
        AgentError::InvalidType(error.to_string())
    }
}

/// A constructed agent whose methods can be called with native arguments.
///
/// `Err` carries a value raised by the agent code, reported to the caller
/// as [`AgentError::CustomError`].
pub trait AgentInstance {
    fn invoke(&mut self, method: &str, args: Vec<HostValue>) -> Result<HostValue, HostValue>;
}

/// Runs one agent instance on behalf of the component-model boundary.
pub struct AgentRuntime {
    store: Rc<SchemaStore>,
    agent_type: Rc<AgentType>,
    instance: Box<dyn AgentInstance>,
    principal: Principal,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("agent_type", &self.agent_type.type_name)
            .field("principal", &self.principal)
            .finish()
    }
}

impl AgentRuntime {
    /// Deserializes constructor arguments and builds the instance with them.
    pub fn construct<F>(
        store: Rc<SchemaStore>,
        class_name: &str,
        input: &DataValue,
        principal: Principal,
        constructor: F,
    ) -> Result<AgentRuntime, AgentError>
    where
        F: FnOnce(Vec<HostValue>) -> Result<Box<dyn AgentInstance>, HostValue>,
    {
        let (Some(agent_type), Some(params)) = (
            store.agent_type(class_name),
            store.constructor_parameters(class_name),
        ) else {
            return Err(AgentError::InvalidAgentId(format!(
                "agent type '{class_name}' is not registered"
            )));
        };

        let args = DataAdapter::new(store.options())
            .deserialize_parameters(input, &params, &principal)
            .map_err(AgentError::invalid_input)?;
        debug!("constructing agent '{class_name}'");
        let instance = constructor(args).map_err(AgentError::CustomError)?;

        Ok(AgentRuntime {
            store,
            agent_type,
            instance,
            principal,
        })
    }

    pub fn agent_type(&self) -> &AgentType {
        &self.agent_type
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Invokes a method as the principal the agent was constructed by.
    pub fn invoke(&mut self, method: &str, input: &DataValue) -> Result<DataValue, AgentError> {
        let principal = self.principal.clone();
        self.invoke_as(method, input, &principal)
    }

    pub fn invoke_as(
        &mut self,
        method: &str,
        input: &DataValue,
        principal: &Principal,
    ) -> Result<DataValue, AgentError> {
        let class_name = self.agent_type.type_name.as_str();
        let Some(schema) = self.store.method(class_name, method) else {
            return Err(AgentError::InvalidMethod(format!(
                "agent '{class_name}' has no method '{method}'"
            )));
        };

        let adapter = DataAdapter::new(self.store.options());
        let args = adapter
            .deserialize_parameters(input, &schema.params, principal)
            .map_err(AgentError::invalid_input)?;
        debug!("invoking {class_name}.{method} with {} argument(s)", args.len());

        let result = self
            .instance
            .invoke(method, args)
            .map_err(AgentError::CustomError)?;
        adapter
            .serialize_return(&result, schema.return_info())
            .map_err(AgentError::invalid_type)
    }
}

#[cfg(test)]
mod tests {
    mod runtime;
}
