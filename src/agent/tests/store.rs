// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::shadow_unrelated,
    clippy::assertions_on_result_states
)] // registration tests unwrap/panic to assert outcomes

use crate::agent::*;
use crate::analysed::*;
use crate::data::{DataSchema, ElementSchema};
use crate::registry::RegistryError;
use crate::typing::{SchemaError, TypeInfoInternal};
use serde_json::json;

fn weather_agent() -> AgentClassDescription {
    serde_json::from_value(json!({
        "className": "WeatherAgent",
        "description": "Reports the weather",
        "constructor": [
            {"name": "region", "type": {"kind": "string"}}
        ],
        "methods": [
            {
                "name": "getWeather",
                "description": "Current weather for a city",
                "promptHint": "Ask about a city",
                "params": [
                    {"name": "city", "type": {"kind": "string"}},
                    {"name": "units", "type": {"kind": "reference", "name": "Units"}},
                    {"name": "caller", "type": {"kind": "principal"}}
                ],
                "returnType": {"kind": "promise", "inner": {"kind": "reference", "name": "Report"}}
            },
            {
                "name": "reset",
                "returnType": {"kind": "void"}
            }
        ],
        "types": {
            "Units": {"kind": "union", "members": [
                {"kind": "literal", "value": "metric"},
                {"kind": "literal", "value": "imperial"}
            ]},
            "Report": {"kind": "object", "properties": [
                {"name": "temperature", "type": {"kind": "number"}},
                {"name": "summary", "type": {"kind": "string"}, "optional": true}
            ]}
        }
    }))
    .unwrap()
}

#[test]
fn test_register_agent() {
    let store = SchemaStore::new();
    let agent_type = store.register(&weather_agent()).unwrap();

    assert_eq!(agent_type.type_name, "WeatherAgent");
    assert_eq!(agent_type.methods.len(), 2);
    assert_eq!(
        agent_type.constructor.input_schema.elements()[0].name,
        "region"
    );

    let method = agent_type.method("getWeather").unwrap();
    assert_eq!(method.prompt_hint.as_deref(), Some("Ask about a city"));
    let names: Vec<_> = method
        .input_schema
        .elements()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, vec!["city", "units"]);
    assert_eq!(
        method.output_schema.elements()[0].schema,
        ElementSchema::ComponentModel {
            element_type: record(vec![
                field("temperature", f64()),
                field("summary", option(str())),
            ])
            .named("report")
        }
    );

    let reset = agent_type.method("reset").unwrap();
    assert_eq!(reset.output_schema, DataSchema::Tuple(vec![]));
}

#[test]
fn test_dispatch_table() {
    let store = SchemaStore::new();
    store.register(&weather_agent()).unwrap();

    let method = store.method("WeatherAgent", "getWeather").unwrap();
    assert_eq!(method.wire_name, "weather-agent.get-weather");
    assert_eq!(method.params.len(), 3);
    assert!(method.params[2].info.is_principal());
    assert!(matches!(
        method.return_info(),
        Some(TypeInfoInternal::Analysed { .. })
    ));

    let params = store.method_parameters("WeatherAgent", "getWeather").unwrap();
    assert_eq!(params.as_slice(), method.params.as_slice());
    assert!(store.method("WeatherAgent", "reset").unwrap().return_info.is_none());
    assert_eq!(store.constructor_parameters("WeatherAgent").unwrap().len(), 1);
    assert!(store.method("WeatherAgent", "missing").is_none());
    assert_eq!(store.agent_types().len(), 1);
}

#[test]
fn test_register_twice() {
    let store = SchemaStore::new();
    store.register(&weather_agent()).unwrap();

    let result = store.register(&weather_agent());
    if let Err(SchemaError::Registry(RegistryError::AlreadyRegistered { class_name })) = result {
        assert_eq!(class_name, "WeatherAgent");
    } else {
        panic!("Expected AlreadyRegistered error");
    }
}

#[test]
fn test_failed_registration_records_nothing() {
    let store = SchemaStore::new();
    let mut class = weather_agent();
    class.methods[1].params.push(
        serde_json::from_value(json!({"name": "hook", "type": {"kind": "function"}})).unwrap(),
    );

    let err = store.register(&class).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Method 'reset' of agent 'WeatherAgent'"));
    assert!(message.contains("Parameter 'hook'"));
    assert!(message.contains("function"));

    assert!(store.agent_type("WeatherAgent").is_none());
    assert!(store.constructor_parameters("WeatherAgent").is_none());
    assert!(store.method("WeatherAgent", "getWeather").is_none());
}

fn class_with_method(class_name: &str, method: &str) -> AgentClassDescription {
    serde_json::from_value(json!({
        "className": class_name,
        "constructor": [{"name": "id", "type": {"kind": "string"}}],
        "methods": [{"name": method, "returnType": {"kind": "string"}}]
    }))
    .unwrap()
}

#[test]
fn test_dotted_names_stay_apart() {
    let store = SchemaStore::new();
    store.register(&class_with_method("A.b", "c")).unwrap();
    store.register(&class_with_method("A", "b.c")).unwrap();

    assert_eq!(store.method("A.b", "c").unwrap().wire_name, "a-b.c");
    assert_eq!(store.method("A", "b.c").unwrap().wire_name, "a.b-c");
    assert!(store.method("A", "c").is_none());
    assert!(store.method("A.b", "b.c").is_none());
    assert_eq!(store.agent_types().len(), 2);
}

#[test]
fn test_clashing_registration_records_nothing() {
    let store = SchemaStore::new();
    store.register(&weather_agent()).unwrap();

    // Same agent type on the wire as WeatherAgent.
    let result = store.register(&class_with_method("weather_agent", "report"));
    if let Err(SchemaError::Registry(RegistryError::TypeNameClash {
        existing,
        type_name,
        ..
    })) = result
    {
        assert_eq!(existing, "WeatherAgent");
        assert_eq!(type_name, "weather-agent");
    } else {
        panic!("Expected TypeNameClash error");
    }
    assert!(store.agent_type("weather_agent").is_none());
    assert!(store.constructor_parameters("weather_agent").is_none());
    assert!(store.method("WeatherAgent", "getWeather").is_some());

    // Two methods calling the same wire function.
    let mut class = class_with_method("Reporter", "getReport");
    class.methods.push(serde_json::from_value(json!({"name": "get_report"})).unwrap());
    let result = store.register(&class);
    if let Err(SchemaError::Registry(RegistryError::WireNameClash {
        first,
        second,
        wire_name,
        ..
    })) = result
    {
        assert_eq!(first, "getReport");
        assert_eq!(second, "get_report");
        assert_eq!(wire_name, "reporter.get-report");
    } else {
        panic!("Expected WireNameClash error");
    }
    assert!(store.agent_type("Reporter").is_none());
    assert!(store.constructor_parameters("Reporter").is_none());

    // The name is still free after the failure.
    store.register(&class_with_method("Reporter", "getReport")).unwrap();
    assert!(store.method("Reporter", "getReport").is_some());
}

#[test]
fn test_multimodal_must_be_alone() {
    let store = SchemaStore::new();
    let class = AgentClassDescription::from_json_str(
        r#"{
            "className": "Describer",
            "methods": [{
                "name": "describe",
                "params": [
                    {"name": "input", "type": {"kind": "multimodal", "element": {"kind": "unstructured-text"}}},
                    {"name": "detail", "type": {"kind": "boolean"}}
                ],
                "returnType": {"kind": "string"}
            }]
        }"#,
    )
    .unwrap();

    let err = store.register(&class).unwrap_err();
    let SchemaError::Context { error, .. } = err else {
        panic!("Expected Context error");
    };
    assert_eq!(
        *error,
        SchemaError::MultimodalNotAlone {
            parameter: "input".to_string()
        }
    );
}

#[test]
fn test_duplicate_names() {
    let store = SchemaStore::new();
    let mut class = weather_agent();
    let again = class.methods[1].clone();
    class.methods.push(again);
    assert_eq!(
        store.register(&class),
        Err(SchemaError::Registry(RegistryError::DuplicateMethod {
            class_name: "WeatherAgent".to_string(),
            method: "reset".to_string(),
        }))
    );
    assert!(store.agent_type("WeatherAgent").is_none());

    let mut class = weather_agent();
    let again = class.constructor[0].clone();
    class.constructor.push(again);
    let err = store.register(&class).unwrap_err();
    assert!(err.to_string().contains("declared more than once"));
}

#[test]
fn test_options() {
    let mut store = SchemaStore::new();
    assert!(!store.options().falsy_defaults);
    store.set_falsy_defaults(true);
    store.set_bigint_for_64bit(false);
    assert!(store.options().falsy_defaults);
    assert!(!store.options().bigint_for_64bit);

    // Units is an enum, so nothing overlaps even when overlaps are rejected.
    store.set_reject_ambiguous_unions(true);
    assert!(store.register(&weather_agent()).is_ok());
}

#[test]
fn test_description_rejects_unknown_fields() {
    let result = AgentClassDescription::from_json_str(r#"{"className": "A", "extra": 1}"#);
    assert!(result.is_err());
}
