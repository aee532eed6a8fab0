// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "arc")]

use lazy_static::lazy_static;
use std::thread;

use agentic_mapping::*;

// Ensure that a schema store can be shared across threads.
lazy_static! {
    static ref STORE: SchemaStore = SchemaStore::new();
}

#[test]
fn shared_store() -> anyhow::Result<()> {
    let class = AgentClassDescription::from_json_str(
        r#"{
            "className": "Echo",
            "methods": [
                {"name": "echo",
                 "params": [{"name": "text", "type": {"kind": "string"}}],
                 "returnType": {"kind": "string"}}
            ]
        }"#,
    )?;
    STORE.register(&class)?;

    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || -> anyhow::Result<HostValue> {
                let Some(schema) = STORE.method("Echo", "echo") else {
                    anyhow::bail!("echo is not registered");
                };
                let adapter = data::DataAdapter::new(STORE.options());
                let text = HostValue::from(format!("hello {i}"));
                let input = adapter.serialize_parameters(&[text], &schema.params)?;
                let args =
                    adapter.deserialize_parameters(&input, &schema.params, &Principal::Anonymous)?;
                Ok(args[0].clone())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle
            .join()
            .map_err(|_| anyhow::anyhow!("thread panicked"))??;
        assert_eq!(value, HostValue::from(format!("hello {i}")));
    }
    Ok(())
}
