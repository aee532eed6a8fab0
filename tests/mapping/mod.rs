// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::common::{init_logger, match_values, process_value};

use agentic_mapping::mapping::{ValueDeserializer, ValueSerializer};
use agentic_mapping::*;
use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    #[serde(rename = "type")]
    typ: AnalysedType,
    value: HostValue,
    wire: Option<Value>,
    expected: Option<HostValue>,
    error: Option<String>,
    #[serde(default)]
    options: MappingOptions,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TestFile {
    cases: Vec<TestCase>,
}

fn run_case(case: &TestCase) -> Result<()> {
    let value = process_value(&case.value)?;
    let result = ValueSerializer::new(&case.options).serialize(&value, &case.typ);

    let wire = match (result, &case.error) {
        (Ok(wire), None) => wire,
        (Err(e), Some(expected)) => {
            let actual = e.to_string();
            if !actual.contains(expected.as_str()) {
                bail!("error '{actual}' does not contain '{expected}'");
            }
            return Ok(());
        }
        (Ok(wire), Some(_)) => bail!("serialization succeeded unexpectedly: {wire:?}"),
        (Err(e), None) => return Err(e.into()),
    };

    if let Some(expected) = &case.wire {
        assert_eq!(&wire, expected);
    }

    // Through the flat node encoding and its byte form.
    let bytes = WitValue::from(&wire).to_bytes()?;
    let restored = WitValue::from_bytes(&bytes)?.to_value()?;
    assert_eq!(restored, wire);

    let host = ValueDeserializer::new(&case.options).deserialize(&restored, &case.typ)?;
    let expected = process_value(case.expected.as_ref().unwrap_or(&case.value))?;
    match_values(&host, &expected)
}

fn run_cases(json: &str) -> Result<()> {
    init_logger();
    let file: TestFile = serde_json::from_str(json)?;
    for case in &file.cases {
        print!("case {} ", case.note);
        match run_case(case) {
            Ok(()) => println!("passed"),
            Err(e) => {
                println!("failed");
                return Err(e);
            }
        }
    }
    Ok(())
}

#[test]
fn scenarios() -> Result<()> {
    run_cases(include_str!("cases/scenarios.json"))
}

#[test]
fn records() -> Result<()> {
    run_cases(include_str!("cases/records.json"))
}

#[test]
fn collections() -> Result<()> {
    run_cases(include_str!("cases/collections.json"))
}

#[test]
fn variants() -> Result<()> {
    run_cases(include_str!("cases/variants.json"))
}
