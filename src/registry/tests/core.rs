// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::shadow_unrelated,
    clippy::assertions_on_result_states
)] // registry tests unwrap/panic to assert outcomes

use crate::agent::{wire_function_name, AgentConstructor, AgentType, MethodSchema};
use crate::analysed;
use crate::data::{DataSchema, ParameterSchema};
use crate::registry::*;
use crate::typing::{HostType, TypeInfoInternal};
use crate::Rc;

fn agent_type(class_name: &str) -> AgentType {
    AgentType {
        type_name: class_name.to_string(),
        description: String::new(),
        constructor: AgentConstructor {
            description: String::new(),
            input_schema: DataSchema::Tuple(vec![]),
        },
        methods: vec![],
    }
}

fn method(class_name: &str, name: &str) -> MethodSchema {
    MethodSchema {
        name: name.to_string(),
        wire_name: wire_function_name(class_name, name),
        params: Rc::new(vec![ParameterSchema {
            name: "city".to_string(),
            info: TypeInfoInternal::analysed(analysed::str(), HostType::String),
        }]),
        return_info: None,
    }
}

fn entry(class_name: &str, methods: &[&str]) -> Result<ClassEntry, RegistryError> {
    ClassEntry::new(
        agent_type(class_name),
        vec![],
        methods.iter().map(|m| method(class_name, m)).collect(),
    )
}

#[test]
fn test_registry_new() {
    let registry = ClassRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.entries().is_empty());
}

#[test]
fn test_insert_and_get() {
    let registry = ClassRegistry::new();
    assert!(registry.get("WeatherAgent").is_none());

    let inserted = registry
        .insert(entry("WeatherAgent", &["getWeather", "reset"]).unwrap())
        .unwrap();
    assert_eq!(registry.len(), 1);

    let retrieved = registry.get("WeatherAgent").unwrap();
    assert!(Rc::ptr_eq(&inserted, &retrieved));
    assert_eq!(retrieved.type_name(), "weather-agent");
    assert!(Rc::ptr_eq(
        &retrieved,
        &registry.get_by_type_name("weather-agent").unwrap()
    ));

    // Lookups by class name need the exact spelling.
    assert!(registry.get("weather_agent").is_none());

    let names: Vec<_> = retrieved.methods().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["getWeather", "reset"]);
    assert_eq!(
        retrieved
            .method_by_wire_name("weather-agent.get-weather")
            .unwrap()
            .name,
        "getWeather"
    );
    assert!(retrieved.method_by_wire_name("weather-agent.missing").is_none());
}

#[test]
fn test_insert_taken() {
    let registry = ClassRegistry::new();
    registry.insert(entry("WeatherAgent", &[]).unwrap()).unwrap();

    let result = registry.insert(entry("WeatherAgent", &["report"]).unwrap());
    assert_eq!(
        result.unwrap_err(),
        RegistryError::AlreadyRegistered {
            class_name: "WeatherAgent".to_string()
        }
    );

    let result = registry.check_available("weather_agent");
    assert_eq!(
        result,
        Err(RegistryError::TypeNameClash {
            class_name: "weather_agent".to_string(),
            existing: "WeatherAgent".to_string(),
            type_name: "weather-agent".to_string(),
        })
    );

    // The first entry is untouched.
    assert!(registry.get("WeatherAgent").unwrap().methods().next().is_none());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_entry_validation() {
    for name in ["", " ", "\t\n", "..", "-"] {
        assert_eq!(
            entry(name, &[]).unwrap_err(),
            RegistryError::InvalidClassName {
                name: name.to_string()
            },
            "Expected error for class name {name:?}"
        );
    }

    assert!(matches!(
        entry("Agent", &["run", " "]),
        Err(RegistryError::InvalidMethodName { .. })
    ));
    assert_eq!(
        entry("Agent", &["run", "stop", "run"]).unwrap_err(),
        RegistryError::DuplicateMethod {
            class_name: "Agent".to_string(),
            method: "run".to_string(),
        }
    );
    assert_eq!(
        entry("Agent", &["runAll", "run_all"]).unwrap_err(),
        RegistryError::WireNameClash {
            class_name: "Agent".to_string(),
            first: "runAll".to_string(),
            second: "run_all".to_string(),
            wire_name: "agent.run-all".to_string(),
        }
    );
}

#[test]
fn test_entries_sorted() {
    let registry = ClassRegistry::new();
    for name in ["Zeta", "Alpha", "Mid"] {
        registry.insert(entry(name, &[]).unwrap()).unwrap();
    }
    let names: Vec<_> = registry
        .entries()
        .iter()
        .map(|e| e.class_name().to_string())
        .collect();
    assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
}

#[test]
fn test_error_display() {
    let error = RegistryError::AlreadyRegistered {
        class_name: "WeatherAgent".to_string(),
    };
    assert_eq!(
        format!("{error}"),
        "Agent type 'WeatherAgent' is already registered"
    );

    let error = RegistryError::WireNameClash {
        class_name: "Agent".to_string(),
        first: "runAll".to_string(),
        second: "run_all".to_string(),
        wire_name: "agent.run-all".to_string(),
    };
    assert_eq!(
        format!("{error}"),
        "Methods 'runAll' and 'run_all' of agent type 'Agent' are both 'agent.run-all' on the wire"
    );
}

#[test]
#[cfg(feature = "arc")]
fn test_concurrent_registration() {
    use std::sync::Barrier;
    use std::thread;

    let registry = Rc::new(ClassRegistry::new());
    let barrier = Rc::new(Barrier::new(3));
    let mut handles = vec![];

    // Three spellings of one agent type race for it.
    for name in ["WeatherAgent", "weather_agent", "weather-agent"] {
        let barrier = Rc::clone(&barrier);
        let registry = Rc::clone(&registry);
        handles.push(thread::spawn(move || {
            let entry = entry(name, &["report"]).unwrap();
            barrier.wait();
            registry.insert(entry).map(|_| ())
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(registry.len(), 1);
}
