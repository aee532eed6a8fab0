// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::RefCell;

use crate::common::init_logger;

use agentic_mapping::rpc::{AgentId, ClientError, RpcError, ScheduledTime};
use agentic_mapping::*;
use anyhow::Result;
use serde_json::json;

#[derive(Default)]
struct Inventory {
    items: Vec<(String, u64)>,
}

impl AgentInstance for Inventory {
    fn invoke(&mut self, method: &str, args: Vec<HostValue>) -> Result<HostValue, HostValue> {
        let text = |e: anyhow::Error| HostValue::from(e.to_string());
        match (method, args.as_slice()) {
            ("add", [item, count]) => {
                let item = item.as_string().map_err(text)?.to_string();
                let count = count.as_number().map_err(text)?.as_u64().unwrap_or(0);
                match self.items.iter_mut().find(|(name, _)| *name == item) {
                    Some((_, total)) => *total += count,
                    None => self.items.push((item, count)),
                }
                Ok(HostValue::from(self.items.iter().map(|(_, c)| c).sum::<u64>()))
            }
            ("stock", []) => Ok(HostValue::from_map_entries(
                self.items
                    .iter()
                    .map(|(name, count)| (HostValue::from(name.as_str()), HostValue::from(*count)))
                    .collect(),
            )),
            ("remove", [item]) => {
                let item = item.as_string().map_err(text)?;
                let before = self.items.len();
                self.items.retain(|(name, _)| name.as_str() != &**item);
                if self.items.len() == before {
                    return Err(HostValue::object([("missing", HostValue::from(&**item))]));
                }
                Ok(HostValue::Undefined)
            }
            _ => Err(HostValue::from("no such method")),
        }
    }
}

fn inventory() -> Result<AgentClassDescription> {
    Ok(serde_json::from_value(json!({
        "className": "Inventory",
        "constructor": [{"name": "warehouse", "type": {"kind": "string"}}],
        "methods": [
            {
                "name": "add",
                "params": [
                    {"name": "item", "type": {"kind": "string"}},
                    {"name": "count", "type": {"kind": "numeric", "width": "u32"}}
                ],
                "returnType": {"kind": "numeric", "width": "u32"}
            },
            {
                "name": "stock",
                "returnType": {"kind": "map", "key": {"kind": "string"}, "value": {"kind": "numeric", "width": "u32"}}
            },
            {
                "name": "remove",
                "params": [{"name": "item", "type": {"kind": "string"}}]
            }
        ]
    }))?)
}

/// Delivers calls to an in-process runtime. Fire-and-forget and scheduled
/// calls are queued until `drain` runs them.
struct Loopback {
    id: AgentId,
    store: Rc<SchemaStore>,
    runtime: RefCell<AgentRuntime>,
    queued: RefCell<Vec<(String, DataValue)>>,
}

impl Loopback {
    fn method_name(&self, function: &str) -> Result<String, RpcError> {
        let class = self
            .store
            .class_by_type_name(&self.id.agent_type)
            .ok_or_else(|| RpcError::NotFound(self.id.clone()))?;
        class
            .method_by_wire_name(function)
            .map(|m| m.name.clone())
            .ok_or_else(|| RpcError::Transport(format!("unknown function {function}")))
    }

    fn check_target(&self, target: &AgentId) -> Result<(), RpcError> {
        if *target == self.id {
            Ok(())
        } else {
            Err(RpcError::NotFound(target.clone()))
        }
    }

    fn drain(&self) -> Result<(), RpcError> {
        let queued = std::mem::take(&mut *self.queued.borrow_mut());
        for (function, input) in queued {
            let method = self.method_name(&function)?;
            self.runtime
                .borrow_mut()
                .invoke(&method, &input)
                .map_err(RpcError::Remote)?;
        }
        Ok(())
    }
}

impl RpcTransport for Loopback {
    fn invoke_and_await(
        &self,
        target: &AgentId,
        function: &str,
        input: DataValue,
    ) -> Result<DataValue, RpcError> {
        self.check_target(target)?;
        let method = self.method_name(function)?;
        self.runtime
            .borrow_mut()
            .invoke(&method, &input)
            .map_err(RpcError::Remote)
    }

    fn invoke(&self, target: &AgentId, function: &str, input: DataValue) -> Result<(), RpcError> {
        self.check_target(target)?;
        self.queued.borrow_mut().push((function.to_string(), input));
        Ok(())
    }

    fn schedule_invocation(
        &self,
        target: &AgentId,
        function: &str,
        input: DataValue,
        _at: ScheduledTime,
    ) -> Result<(), RpcError> {
        self.invoke(target, function, input)
    }
}

fn setup() -> Result<(Rc<SchemaStore>, Loopback)> {
    init_logger();
    let store = SchemaStore::new();
    store.register(&inventory()?)?;
    let store = Rc::new(store);

    let params = store
        .constructor_parameters("Inventory")
        .ok_or_else(|| anyhow::anyhow!("missing constructor"))?;
    let input = data::DataAdapter::new(store.options())
        .serialize_parameters(&[HostValue::from("north")], &params)?;
    let runtime = AgentRuntime::construct(
        store.clone(),
        "Inventory",
        &input,
        Principal::Anonymous,
        |args| {
            assert_eq!(args, vec![HostValue::from("north")]);
            Ok(Box::new(Inventory::default()))
        },
    )?;

    let loopback = Loopback {
        id: "inventory(\"north\")".parse()?,
        store: store.clone(),
        runtime: RefCell::new(runtime),
        queued: RefCell::new(vec![]),
    };
    Ok((store, loopback))
}

#[test]
fn call_through_loopback() -> Result<()> {
    let (store, loopback) = setup()?;
    let target = loopback.id.clone();
    let client = RemoteClient::new(store, "Inventory", target, loopback)?;

    assert_eq!(
        client.call("add", &[HostValue::from("bolt"), HostValue::from(10u32)])?,
        HostValue::from(10u32)
    );
    assert_eq!(
        client.call("add", &[HostValue::from("nut"), HostValue::from(5u32)])?,
        HostValue::from(15u32)
    );
    assert_eq!(
        client.call("stock", &[])?,
        HostValue::from_map_entries(vec![
            (HostValue::from("bolt"), HostValue::from(10u32)),
            (HostValue::from("nut"), HostValue::from(5u32)),
        ])
    );
    assert_eq!(
        client.call("remove", &[HostValue::from("nut")])?,
        HostValue::Undefined
    );
    Ok(())
}

#[test]
fn remote_failures() -> Result<()> {
    let (store, loopback) = setup()?;
    let target = loopback.id.clone();
    let client = RemoteClient::new(store, "Inventory", target, loopback)?;

    let result = client.call("remove", &[HostValue::from("gear")]);
    if let Err(ClientError::Rpc(RpcError::Remote(AgentError::CustomError(value)))) = result {
        assert_eq!(value, HostValue::object([("missing", HostValue::from("gear"))]));
    } else {
        panic!("Expected CustomError");
    }

    // 2^32 does not fit the declared u32 and never leaves the caller.
    let result = client.call("add", &[HostValue::from("bolt"), HostValue::from(1u64 << 32)]);
    if let Err(ClientError::Mapping(MappingError::InParameter { parameter, .. })) = result {
        assert_eq!(parameter, "count");
    } else {
        panic!("Expected InParameter error");
    }
    Ok(())
}

#[test]
fn wrong_target() -> Result<()> {
    let (store, loopback) = setup()?;
    let client = RemoteClient::new(
        store,
        "Inventory",
        AgentId::new("inventory", "\"south\""),
        loopback,
    )?;

    let result = client.call("stock", &[]);
    assert!(matches!(
        result,
        Err(ClientError::Rpc(RpcError::NotFound(id))) if id.to_string() == "inventory(\"south\")"
    ));
    Ok(())
}

#[test]
fn queued_calls() -> Result<()> {
    let (store, loopback) = setup()?;
    let target = loopback.id.clone();
    let client = RemoteClient::new(store, "Inventory", target, loopback)?;

    client.trigger("add", &[HostValue::from("bolt"), HostValue::from(1u32)])?;
    client.schedule(
        "add",
        &[HostValue::from("bolt"), HostValue::from(2u32)],
        ScheduledTime {
            seconds: 60,
            nanoseconds: 0,
        },
    )?;
    assert_eq!(client.call("stock", &[])?, HostValue::from_map_entries(vec![]));

    client.transport().drain()?;
    assert_eq!(
        client.call("stock", &[])?,
        HostValue::from_map_entries(vec![(HostValue::from("bolt"), HostValue::from(3u32))])
    );
    Ok(())
}
