// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::common::init_logger;

use agentic_mapping::data::DataAdapter;
use agentic_mapping::host::TypedArray;
use agentic_mapping::*;
use anyhow::Result;
use serde_json::json;

struct Translator {
    calls: u32,
}

impl AgentInstance for Translator {
    fn invoke(&mut self, method: &str, args: Vec<HostValue>) -> Result<HostValue, HostValue> {
        self.calls += 1;
        match (method, args.as_slice()) {
            ("translate", [doc, target]) => {
                let text = doc.field("val").cloned().unwrap_or(HostValue::Undefined);
                match target.as_string().map(|t| t.to_string()).as_deref() {
                    Ok("de") if text == HostValue::from("Hello") => Ok(HostValue::object([
                        ("tag", HostValue::from("ok")),
                        ("value", HostValue::from("Hallo")),
                    ])),
                    _ => Ok(HostValue::object([
                        ("tag", HostValue::from("err")),
                        ("error", HostValue::from("unsupported language pair")),
                    ])),
                }
            }
            ("describe", [parts]) => {
                let count = parts.as_array().map(|p| p.len()).unwrap_or(0);
                Ok(HostValue::from(count))
            }
            ("calls", []) => Ok(HostValue::from(self.calls)),
            _ => Err(HostValue::from("no such method")),
        }
    }
}

fn translator() -> Result<AgentClassDescription> {
    Ok(serde_json::from_value(json!({
        "className": "Translator",
        "description": "Translates short documents",
        "methods": [
            {
                "name": "translate",
                "params": [
                    {"name": "doc", "type": {"kind": "unstructured-text"}, "languages": ["en", "de"]},
                    {"name": "target", "type": {"kind": "reference", "name": "Language"}}
                ],
                "returnType": {"kind": "promise", "inner": {"kind": "reference", "name": "Outcome"}}
            },
            {
                "name": "describe",
                "params": [
                    {"name": "parts", "type": {"kind": "multimodal", "element": {"kind": "union", "members": [
                        {"kind": "unstructured-text"},
                        {"kind": "unstructured-binary"}
                    ]}}}
                ],
                "returnType": {"kind": "numeric", "width": "u32"}
            },
            {
                "name": "calls",
                "returnType": {"kind": "numeric", "width": "u32"}
            }
        ],
        "types": {
            "Language": {"kind": "union", "members": [
                {"kind": "literal", "value": "en"},
                {"kind": "literal", "value": "de"},
                {"kind": "literal", "value": "fr"}
            ]},
            "Outcome": {"kind": "union", "members": [
                {"kind": "object", "properties": [
                    {"name": "tag", "type": {"kind": "literal", "value": "ok"}},
                    {"name": "value", "type": {"kind": "string"}}
                ]},
                {"kind": "object", "properties": [
                    {"name": "tag", "type": {"kind": "literal", "value": "err"}},
                    {"name": "error", "type": {"kind": "string"}}
                ]}
            ]}
        }
    }))?)
}

fn setup() -> Result<(Rc<SchemaStore>, AgentRuntime)> {
    init_logger();
    let store = SchemaStore::new();
    store.register(&translator()?)?;
    let store = Rc::new(store);

    let runtime = AgentRuntime::construct(
        store.clone(),
        "Translator",
        &DataValue::empty(),
        Principal::Anonymous,
        |_| Ok(Box::new(Translator { calls: 0 })),
    )?;
    Ok((store, runtime))
}

/// Serializes a call, sends it through json as a host would, and maps the
/// result back.
fn call(
    store: &SchemaStore,
    runtime: &mut AgentRuntime,
    method: &str,
    args: &[HostValue],
) -> Result<Result<HostValue, AgentError>> {
    let Some(schema) = store.method("Translator", method) else {
        anyhow::bail!("unknown method {method}");
    };
    let adapter = DataAdapter::new(store.options());
    let input = adapter.serialize_parameters(args, &schema.params)?;
    let input: DataValue = serde_json::from_str(&serde_json::to_string(&input)?)?;

    match runtime.invoke(method, &input) {
        Ok(output) => {
            let output: DataValue = serde_json::from_str(&serde_json::to_string(&output)?)?;
            Ok(Ok(adapter.deserialize_return(&output, schema.return_info())?))
        }
        Err(e) => Ok(Err(e)),
    }
}

fn text(data: &str, language: &str) -> HostValue {
    HostValue::object([
        ("tag", HostValue::from("inline")),
        ("val", HostValue::from(data)),
        ("languageCode", HostValue::from(language)),
    ])
}

#[test]
fn translate_round_trip() -> Result<()> {
    let (store, mut runtime) = setup()?;

    let result = call(
        &store,
        &mut runtime,
        "translate",
        &[text("Hello", "en"), HostValue::from("de")],
    )?;
    assert_eq!(
        result,
        Ok(HostValue::object([
            ("tag", HostValue::from("ok")),
            ("value", HostValue::from("Hallo")),
        ]))
    );

    let result = call(
        &store,
        &mut runtime,
        "translate",
        &[text("Hello", "en"), HostValue::from("fr")],
    )?;
    assert_eq!(
        result,
        Ok(HostValue::object([
            ("tag", HostValue::from("err")),
            ("error", HostValue::from("unsupported language pair")),
        ]))
    );
    Ok(())
}

#[test]
fn translate_rejects_bad_input() -> Result<()> {
    let (store, mut runtime) = setup()?;

    // The language restriction is checked by the receiving side.
    let result = call(
        &store,
        &mut runtime,
        "translate",
        &[text("Bonjour", "fr"), HostValue::from("de")],
    )?;
    if let Err(AgentError::InvalidInput(message)) = result {
        assert!(message.contains("'doc'"));
        assert!(message.contains("en, de"));
    } else {
        panic!("Expected InvalidInput error");
    }

    // Enum values are checked by the calling side.
    let schema = store
        .method("Translator", "translate")
        .ok_or_else(|| anyhow::anyhow!("missing method"))?;
    let result = DataAdapter::new(store.options())
        .serialize_parameters(&[text("Hello", "en"), HostValue::from("es")], &schema.params);
    if let Err(MappingError::InParameter { parameter, error }) = result {
        assert_eq!(parameter, "target");
        assert!(error.to_string().contains("expected one of en, de, fr"));
    } else {
        panic!("Expected InParameter error");
    }
    Ok(())
}

#[test]
fn multimodal_parts() -> Result<()> {
    let (store, mut runtime) = setup()?;

    let image = HostValue::object([
        ("tag", HostValue::from("inline")),
        ("val", HostValue::from(TypedArray::Uint8(vec![0x89, 0x50, 0x4e, 0x47]))),
        ("mimeType", HostValue::from("image/png")),
    ]);
    let parts = HostValue::from(vec![text("caption", "en"), image, text("more", "de")]);

    let result = call(&store, &mut runtime, "describe", &[parts])?;
    assert_eq!(result, Ok(HostValue::from(3u32)));

    let schema = store
        .method("Translator", "describe")
        .ok_or_else(|| anyhow::anyhow!("missing method"))?;
    let input = DataAdapter::new(store.options())
        .serialize_parameters(&[HostValue::from(vec![HostValue::from(1u32)])], &schema.params);
    if let Err(MappingError::InParameter { error, .. }) = input {
        assert!(error.to_string().contains("text, binary"));
    } else {
        panic!("Expected InParameter error");
    }
    Ok(())
}

#[test]
fn agent_metadata() -> Result<()> {
    let (store, mut runtime) = setup()?;

    let agent_type = runtime.agent_type();
    assert_eq!(agent_type.type_name, "Translator");
    assert_eq!(agent_type.description, "Translates short documents");
    assert!(agent_type.constructor.input_schema.elements().is_empty());
    assert_eq!(
        store.agent_types().iter().map(|a| a.type_name.clone()).collect::<Vec<_>>(),
        vec!["Translator".to_string()]
    );

    // The count includes the call asking for it.
    assert_eq!(call(&store, &mut runtime, "calls", &[])?, Ok(HostValue::from(1u32)));
    assert!(matches!(
        runtime.invoke("translateAll", &DataValue::empty()),
        Err(AgentError::InvalidMethod(_))
    ));
    Ok(())
}
