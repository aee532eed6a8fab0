// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::shadow_unrelated,
    clippy::assertions_on_result_states
)] // runtime tests unwrap/panic to assert outcomes

use crate::agent::{AgentClassDescription, SchemaStore};
use crate::data::{DataAdapter, DataValue};
use crate::host::HostValue;
use crate::invoke::*;
use crate::principal::{AgentPrincipal, Principal};
use crate::Rc;

struct Counter {
    name: String,
    count: u64,
}

impl AgentInstance for Counter {
    fn invoke(&mut self, method: &str, args: Vec<HostValue>) -> Result<HostValue, HostValue> {
        match method {
            "increment" => {
                let by = args[0].as_number().map_err(|e| HostValue::from(e.to_string()))?;
                self.count += by.as_u64().unwrap_or(0);
                Ok(HostValue::from(self.count))
            }
            "whoami" => Ok(args[0].clone()),
            "describe" => Ok(HostValue::from(format!("{} at {}", self.name, self.count))),
            "broken" => Ok(HostValue::from("not a number")),
            _ => Err(HostValue::from(format!("unexpected method {method}"))),
        }
    }
}

fn store() -> Rc<SchemaStore> {
    let store = SchemaStore::new();
    let class = AgentClassDescription::from_json_str(
        r#"{
            "className": "Counter",
            "constructor": [{"name": "name", "type": {"kind": "string"}}],
            "methods": [
                {"name": "increment",
                 "params": [{"name": "by", "type": {"kind": "numeric", "width": "u32"}}],
                 "returnType": {"kind": "numeric", "width": "u32"}},
                {"name": "whoami",
                 "params": [{"name": "caller", "type": {"kind": "principal"}}],
                 "returnType": {"kind": "string"}},
                {"name": "describe", "returnType": {"kind": "string"}},
                {"name": "broken", "returnType": {"kind": "numeric", "width": "u32"}},
                {"name": "fail", "returnType": {"kind": "void"}}
            ]
        }"#,
    )
    .unwrap();
    store.register(&class).unwrap();
    Rc::new(store)
}

fn construct(store: &Rc<SchemaStore>) -> AgentRuntime {
    let params = store.constructor_parameters("Counter").unwrap();
    let input = DataAdapter::new(store.options())
        .serialize_parameters(&[HostValue::from("clicks")], &params)
        .unwrap();
    AgentRuntime::construct(
        store.clone(),
        "Counter",
        &input,
        Principal::Anonymous,
        |args| {
            let name = args[0].as_string().unwrap().to_string();
            Ok(Box::new(Counter { name, count: 0 }))
        },
    )
    .unwrap()
}

fn call(
    store: &Rc<SchemaStore>,
    runtime: &mut AgentRuntime,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, AgentError> {
    let schema = store.method("Counter", method).unwrap();
    let adapter = DataAdapter::new(store.options());
    let input = adapter.serialize_parameters(args, &schema.params).unwrap();
    let output = runtime.invoke(method, &input)?;
    Ok(adapter.deserialize_return(&output, schema.return_info()).unwrap())
}

#[test]
fn test_invoke_round_trip() {
    let store = store();
    let mut runtime = construct(&store);

    assert_eq!(
        call(&store, &mut runtime, "increment", &[HostValue::from(3u32)]).unwrap(),
        HostValue::from(3u32)
    );
    assert_eq!(
        call(&store, &mut runtime, "increment", &[HostValue::from(4u32)]).unwrap(),
        HostValue::from(7u32)
    );
    assert_eq!(
        call(&store, &mut runtime, "describe", &[]).unwrap(),
        HostValue::from("clicks at 7")
    );
    assert_eq!(
        call(&store, &mut runtime, "fail", &[]),
        Err(AgentError::CustomError(HostValue::from(
            "unexpected method fail"
        )))
    );
}

#[test]
fn test_principal_injection() {
    let store = store();
    let mut runtime = construct(&store);
    let schema = store.method("Counter", "whoami").unwrap();
    let adapter = DataAdapter::new(store.options());

    // The caller supplies no arguments; the principal is injected.
    let input = adapter.serialize_parameters(&[], &schema.params).unwrap();
    assert!(input.is_empty());

    let caller = Principal::Agent(AgentPrincipal {
        agent_id: "planner(\"a\")".to_string(),
    });
    let result = runtime.invoke_as("whoami", &input, &caller);
    // A principal is not a string, so the declared return type rejects it.
    assert!(matches!(result, Err(AgentError::InvalidType(_))));
}

#[test]
fn test_invalid_method_and_input() {
    let store = store();
    let mut runtime = construct(&store);

    let result = runtime.invoke("missing", &DataValue::empty());
    if let Err(AgentError::InvalidMethod(message)) = result {
        assert!(message.contains("missing"));
    } else {
        panic!("Expected InvalidMethod error");
    }

    let result = runtime.invoke("increment", &DataValue::empty());
    if let Err(AgentError::InvalidInput(message)) = result {
        assert!(message.contains("Expected 1 arguments, got 0"));
    } else {
        panic!("Expected InvalidInput error");
    }

    let result = runtime.invoke("broken", &DataValue::empty());
    if let Err(AgentError::InvalidType(message)) = result {
        assert!(message.contains("return-value"));
    } else {
        panic!("Expected InvalidType error");
    }
}

#[test]
fn test_unknown_agent_type() {
    let store = store();
    let result = AgentRuntime::construct(
        store,
        "Missing",
        &DataValue::empty(),
        Principal::Anonymous,
        |_| panic!("constructor must not run"),
    );
    assert!(matches!(result, Err(AgentError::InvalidAgentId(_))));
}

#[test]
fn test_error_serialization() {
    let error = AgentError::InvalidMethod("nope".to_string());
    let json = serde_json::to_value(&error).unwrap();
    assert_eq!(json, serde_json::json!({"type": "invalid-method", "value": "nope"}));
}
