// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Agent class registration.
//!
//! A class becomes known through an [`AgentClassDescription`]: its name, the
//! host types of its constructor and method parameters, and the return type
//! of each method. [`SchemaStore::register`] resolves all of it up front and
//! records the result, so a class that cannot be mapped is rejected before
//! any instance of it exists.

use std::collections::BTreeSet;

use anyhow::Result;
use heck::ToKebabCase;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::{input_schema, output_schema, DataSchema, ParameterSchema};
use crate::options::MappingOptions;
use crate::registry::{agent_type_name, ClassEntry, ClassRegistry};
use crate::typing::{
    HostType, Restrictions, SchemaBuilder, SchemaError, TypeInfoInternal, TypeScope,
};
use crate::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParameterDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: HostType,
    /// Allowed language codes of an unstructured text parameter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Allowed MIME types of an unstructured binary parameter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mime_types: Vec<String>,
}

fn void() -> HostType {
    HostType::Void
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MethodDescription {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParameterDescription>,
    #[serde(default = "void")]
    pub return_type: HostType,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_hint: Option<String>,
}

/// Structural description of an agent class, as supplied at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentClassDescription {
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub constructor: Vec<ParameterDescription>,
    #[serde(default)]
    pub methods: Vec<MethodDescription>,
    /// Named types the parameter and return types refer to.
    #[serde(default)]
    pub types: TypeScope,
}

impl AgentClassDescription {
    pub fn from_json_str(json: &str) -> Result<AgentClassDescription> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConstructor {
    pub description: String,
    pub input_schema: DataSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMethod {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_hint: Option<String>,
    pub input_schema: DataSchema,
    pub output_schema: DataSchema,
}

/// Published metadata of a registered agent class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentType {
    pub type_name: String,
    pub description: String,
    pub constructor: AgentConstructor,
    pub methods: Vec<AgentMethod>,
}

impl AgentType {
    pub fn method(&self, name: &str) -> Option<&AgentMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Dispatch entry of a method: everything needed to map a call to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSchema {
    pub name: String,
    /// Function name used on the wire, `{agent-type}.{method-name}`.
    pub wire_name: String,
    pub params: Rc<Vec<ParameterSchema>>,
    /// `None` when the method returns nothing.
    pub return_info: Option<TypeInfoInternal>,
}

impl MethodSchema {
    pub fn return_info(&self) -> Option<&TypeInfoInternal> {
        self.return_info.as_ref()
    }
}

pub fn wire_function_name(class_name: &str, method_name: &str) -> String {
    format!(
        "{}.{}",
        agent_type_name(class_name),
        method_name.to_kebab_case()
    )
}

/// A class resolved but not yet recorded.
struct ResolvedClass {
    constructor: Vec<ParameterSchema>,
    methods: Vec<MethodSchema>,
    agent_type: AgentType,
}

/// Owns the schemas of every registered agent class.
///
/// The registry is append-only: a class is registered once, and its schemas
/// are read by every later invocation.
pub struct SchemaStore {
    options: MappingOptions,
    classes: ClassRegistry,
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaStore")
            .field("options", &self.options)
            .field(
                "agent_types",
                &self
                    .classes
                    .entries()
                    .iter()
                    .map(|e| e.class_name().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::with_options(MappingOptions::default())
    }

    pub fn with_options(options: MappingOptions) -> Self {
        Self {
            options,
            classes: ClassRegistry::new(),
        }
    }

    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MappingOptions) {
        self.options = options;
    }

    /// Fill missing `string`, numeric and `bool` record fields with zero values.
    pub fn set_falsy_defaults(&mut self, b: bool) {
        self.options.falsy_defaults = b;
    }

    /// Reject untagged unions whose cases overlap at registration.
    pub fn set_reject_ambiguous_unions(&mut self, b: bool) {
        self.options.reject_ambiguous_unions = b;
    }

    pub fn set_bigint_for_64bit(&mut self, b: bool) {
        self.options.bigint_for_64bit = b;
    }

    /// Resolves and records an agent class.
    ///
    /// The class is recorded as one entry, and only once every parameter and
    /// return type has resolved and its dispatch table is consistent.
    pub fn register(&self, class: &AgentClassDescription) -> Result<Rc<AgentType>, SchemaError> {
        self.classes.check_available(&class.class_name)?;

        let resolved = self.resolve_class(class)?;
        let entry = ClassEntry::new(resolved.agent_type, resolved.constructor, resolved.methods)?;
        let entry = self.classes.insert(entry)?;

        debug!(
            "registered agent class '{}' as '{}' with {} method(s)",
            entry.class_name(),
            entry.type_name(),
            entry.agent_type().methods.len()
        );
        Ok(Rc::clone(entry.agent_type()))
    }

    fn resolve_class(&self, class: &AgentClassDescription) -> Result<ResolvedClass, SchemaError> {
        let class_name = &class.class_name;
        let mut builder = SchemaBuilder::new(&class.types, &self.options);

        let constructor = resolve_parameters(&mut builder, &class.constructor)
            .map_err(|e| e.within(format!("Constructor of agent '{class_name}'")))?;
        let constructor_schema = input_schema(&constructor)
            .map_err(|e| e.within(format!("Constructor of agent '{class_name}'")))?;

        let mut methods = Vec::with_capacity(class.methods.len());
        let mut agent_methods = Vec::with_capacity(class.methods.len());
        for method in &class.methods {
            let location = format!("Method '{}' of agent '{class_name}'", method.name);
            let params = resolve_parameters(&mut builder, &method.params)
                .map_err(|e| e.within(location.as_str()))?;
            let return_info = builder
                .resolve_return(&method.return_type)
                .map_err(|e| e.within(format!("Return type of {location}")))?;
            let input = input_schema(&params).map_err(|e| e.within(location.as_str()))?;
            let output = output_schema(return_info.as_ref())
                .map_err(|e| e.within(format!("Return type of {location}")))?;

            agent_methods.push(AgentMethod {
                name: method.name.clone(),
                description: method.description.clone(),
                prompt_hint: method.prompt_hint.clone(),
                input_schema: input,
                output_schema: output,
            });
            methods.push(MethodSchema {
                name: method.name.clone(),
                wire_name: wire_function_name(class_name, &method.name),
                params: Rc::new(params),
                return_info,
            });
        }

        Ok(ResolvedClass {
            constructor,
            methods,
            agent_type: AgentType {
                type_name: class_name.clone(),
                description: class.description.clone(),
                constructor: AgentConstructor {
                    description: class.description.clone(),
                    input_schema: constructor_schema,
                },
                methods: agent_methods,
            },
        })
    }

    pub fn agent_type(&self, class_name: &str) -> Option<Rc<AgentType>> {
        self.classes
            .get(class_name)
            .map(|e| Rc::clone(e.agent_type()))
    }

    /// All registered agent types, sorted by name.
    pub fn agent_types(&self) -> Vec<Rc<AgentType>> {
        self.classes
            .entries()
            .iter()
            .map(|e| Rc::clone(e.agent_type()))
            .collect()
    }

    /// The class whose agent type is `type_name` on the wire.
    pub fn class_by_type_name(&self, type_name: &str) -> Option<Rc<ClassEntry>> {
        self.classes.get_by_type_name(type_name)
    }

    pub fn constructor_parameters(&self, class_name: &str) -> Option<Rc<Vec<ParameterSchema>>> {
        self.classes
            .get(class_name)
            .map(|e| Rc::clone(e.constructor()))
    }

    pub fn method_parameters(
        &self,
        class_name: &str,
        method_name: &str,
    ) -> Option<Rc<Vec<ParameterSchema>>> {
        self.method(class_name, method_name)
            .map(|m| Rc::clone(&m.params))
    }

    pub fn method(&self, class_name: &str, method_name: &str) -> Option<Rc<MethodSchema>> {
        self.classes
            .get(class_name)
            .and_then(|e| e.method(method_name).cloned())
    }
}

fn resolve_parameters(
    builder: &mut SchemaBuilder<'_>,
    params: &[ParameterDescription],
) -> Result<Vec<ParameterSchema>, SchemaError> {
    let mut seen = BTreeSet::new();
    let mut resolved = Vec::with_capacity(params.len());
    for param in params {
        if !seen.insert(param.name.as_str()) {
            return Err(SchemaError::DuplicateParameter {
                name: param.name.clone(),
            });
        }
        let restrictions = Restrictions {
            languages: param.languages.clone(),
            mime_types: param.mime_types.clone(),
        };
        let info = builder
            .resolve_parameter(&param.name, &param.typ, &restrictions)
            .map_err(|e| e.within(format!("Parameter '{}'", param.name)))?;
        resolved.push(ParameterSchema {
            name: param.name.clone(),
            info,
        });
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    mod store;
}
