// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Registered agent classes.
//!
//! A class is recorded as a single [`ClassEntry`]: its published metadata,
//! its constructor parameters and its method dispatch table. Entries are
//! keyed by the agent type name used on the wire, so two classes whose
//! names only differ in spelling (`WeatherAgent`, `weather_agent`) cannot
//! both be registered.

use std::collections::BTreeMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use heck::ToKebabCase;

use crate::agent::{AgentType, MethodSchema};
use crate::data::ParameterSchema;
use crate::Rc;

#[cfg(test)]
mod tests {
    mod core;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Agent type '{class_name}' is already registered")]
    AlreadyRegistered { class_name: String },

    #[error("Agent type '{class_name}' clashes with registered '{existing}': both are '{type_name}' on the wire")]
    TypeNameClash {
        class_name: String,
        existing: String,
        type_name: String,
    },

    #[error("Agent type name '{name}' is invalid: it must contain a letter or digit")]
    InvalidClassName { name: String },

    #[error("Method name '{method}' of agent type '{class_name}' is invalid: it must contain a letter or digit")]
    InvalidMethodName { class_name: String, method: String },

    #[error("Method '{method}' of agent type '{class_name}' is declared more than once")]
    DuplicateMethod { class_name: String, method: String },

    #[error("Methods '{first}' and '{second}' of agent type '{class_name}' are both '{wire_name}' on the wire")]
    WireNameClash {
        class_name: String,
        first: String,
        second: String,
        wire_name: String,
    },
}

/// Name of an agent type on the wire.
pub fn agent_type_name(class_name: &str) -> String {
    class_name.to_kebab_case()
}

/// Names that lose every letter and digit in kebab case cannot be called.
fn is_callable_name(name: &str) -> bool {
    !name.to_kebab_case().is_empty()
}

pub fn validate_class_name(class_name: &str) -> Result<(), RegistryError> {
    if is_callable_name(class_name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidClassName {
            name: class_name.to_string(),
        })
    }
}

/// Everything recorded for one agent class.
#[derive(Debug)]
pub struct ClassEntry {
    agent_type: Rc<AgentType>,
    constructor: Rc<Vec<ParameterSchema>>,
    methods: BTreeMap<String, Rc<MethodSchema>>,
}

impl ClassEntry {
    /// Builds the dispatch table of a class. Every method needs a callable
    /// name and a wire function name of its own.
    pub fn new(
        agent_type: AgentType,
        constructor: Vec<ParameterSchema>,
        methods: Vec<MethodSchema>,
    ) -> Result<ClassEntry, RegistryError> {
        let class_name = agent_type.type_name.as_str();
        validate_class_name(class_name)?;

        let mut wire_names: BTreeMap<&str, &str> = BTreeMap::new();
        for method in &methods {
            if !is_callable_name(&method.name) {
                return Err(RegistryError::InvalidMethodName {
                    class_name: class_name.to_string(),
                    method: method.name.clone(),
                });
            }
            if let Some(first) = wire_names.insert(&method.wire_name, &method.name) {
                return Err(if first == method.name {
                    RegistryError::DuplicateMethod {
                        class_name: class_name.to_string(),
                        method: method.name.clone(),
                    }
                } else {
                    RegistryError::WireNameClash {
                        class_name: class_name.to_string(),
                        first: first.to_string(),
                        second: method.name.clone(),
                        wire_name: method.wire_name.clone(),
                    }
                });
            }
        }

        let methods = methods
            .into_iter()
            .map(|m| (m.name.clone(), Rc::new(m)))
            .collect();
        Ok(ClassEntry {
            agent_type: Rc::new(agent_type),
            constructor: Rc::new(constructor),
            methods,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.agent_type.type_name
    }

    pub fn type_name(&self) -> String {
        agent_type_name(self.class_name())
    }

    pub fn agent_type(&self) -> &Rc<AgentType> {
        &self.agent_type
    }

    pub fn constructor(&self) -> &Rc<Vec<ParameterSchema>> {
        &self.constructor
    }

    pub fn method(&self, name: &str) -> Option<&Rc<MethodSchema>> {
        self.methods.get(name)
    }

    /// The method called through `wire_name`, e.g. `weather-agent.get-weather`.
    pub fn method_by_wire_name(&self, wire_name: &str) -> Option<&Rc<MethodSchema>> {
        self.methods.values().find(|m| m.wire_name == wire_name)
    }

    /// Methods sorted by name.
    pub fn methods(&self) -> impl Iterator<Item = &Rc<MethodSchema>> + '_ {
        self.methods.values()
    }
}

/// Append-only, thread-safe map from agent type names to class entries.
///
/// An entry is inserted whole or not at all, so a failed registration
/// leaves no trace.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: DashMap<String, Rc<ClassEntry>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn taken(class_name: &str, existing: &ClassEntry) -> RegistryError {
        if existing.class_name() == class_name {
            RegistryError::AlreadyRegistered {
                class_name: class_name.to_string(),
            }
        } else {
            RegistryError::TypeNameClash {
                class_name: class_name.to_string(),
                existing: existing.class_name().to_string(),
                type_name: existing.type_name(),
            }
        }
    }

    /// Whether `class_name` could be registered now. Registration checks
    /// this before resolving any schema.
    pub fn check_available(&self, class_name: &str) -> Result<(), RegistryError> {
        validate_class_name(class_name)?;
        match self.classes.get(&agent_type_name(class_name)) {
            Some(existing) => Err(Self::taken(class_name, &existing)),
            None => Ok(()),
        }
    }

    pub fn insert(&self, entry: ClassEntry) -> Result<Rc<ClassEntry>, RegistryError> {
        match self.classes.entry(entry.type_name()) {
            Entry::Occupied(e) => Err(Self::taken(entry.class_name(), e.get())),
            Entry::Vacant(e) => {
                let entry = Rc::new(entry);
                e.insert(Rc::clone(&entry));
                Ok(entry)
            }
        }
    }

    pub fn get(&self, class_name: &str) -> Option<Rc<ClassEntry>> {
        self.classes
            .get(&agent_type_name(class_name))
            .filter(|e| e.class_name() == class_name)
            .map(|e| Rc::clone(e.value()))
    }

    pub fn get_by_type_name(&self, type_name: &str) -> Option<Rc<ClassEntry>> {
        self.classes.get(type_name).map(|e| Rc::clone(e.value()))
    }

    /// All entries, sorted by class name.
    pub fn entries(&self) -> Vec<Rc<ClassEntry>> {
        let mut entries: Vec<_> = self.classes.iter().map(|e| Rc::clone(e.value())).collect();
        entries.sort_by(|a, b| a.class_name().cmp(b.class_name()));
        entries
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
