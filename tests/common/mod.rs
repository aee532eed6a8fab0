// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared utilities for json-based test cases.

#![allow(dead_code)]

use std::str::FromStr;

use agentic_mapping::host::TypedArray;
use agentic_mapping::*;
use anyhow::{anyhow, bail, Result};
use num_bigint::BigInt;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Process a host value read from json to interpret special encodings.
pub fn process_value(v: &HostValue) -> Result<HostValue> {
    match v {
        // Handle Undefined encoded as a string "#undefined"
        HostValue::String(s) if s.as_ref() == "#undefined" => Ok(HostValue::Undefined),

        // Handle bigints encoded as an object
        // {"bigint!": "123456789012345678901"}
        HostValue::Object(fields) if fields.len() == 1 && v.field("bigint!").is_some() => {
            let digits = v
                .field("bigint!")
                .ok_or_else(|| anyhow!("missing digits"))?
                .as_string()?;
            Ok(HostValue::from(BigInt::from_str(digits)?))
        }

        // Handle maps encoded as a list of entries
        // {"map!": [[key, value], ...]}
        HostValue::Object(fields) if fields.len() == 1 && v.field("map!").is_some() => {
            let mut entries = vec![];
            for entry in v
                .field("map!")
                .ok_or_else(|| anyhow!("missing entries"))?
                .as_array()?
            {
                match entry.as_array()?.as_slice() {
                    [key, value] => entries.push((process_value(key)?, process_value(value)?)),
                    _ => bail!("map entries must be pairs"),
                }
            }
            Ok(HostValue::from_map_entries(entries))
        }

        // Handle byte arrays
        // {"u8array!": [1, 2, 3]}
        HostValue::Object(fields) if fields.len() == 1 && v.field("u8array!").is_some() => {
            let mut bytes = vec![];
            for item in v
                .field("u8array!")
                .ok_or_else(|| anyhow!("missing bytes"))?
                .as_array()?
            {
                let byte = item
                    .as_number()?
                    .as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| anyhow!("{item} is not a byte"))?;
                bytes.push(byte);
            }
            Ok(HostValue::from(TypedArray::Uint8(bytes)))
        }

        // Recursively process arrays
        HostValue::Array(items) => {
            let mut array_value = HostValue::new_array();
            let array = array_value.as_array_mut()?;
            for item in items.iter() {
                array.push(process_value(item)?);
            }
            Ok(array_value)
        }

        // Recursively process objects
        HostValue::Object(fields) => {
            let mut object_value = HostValue::new_object();
            let object = object_value.as_object_mut()?;
            for (key, value) in fields.iter() {
                object.insert(key.clone(), process_value(value)?);
            }
            Ok(object_value)
        }

        // Simple variants
        _ => Ok(v.clone()),
    }
}

/// Match computed and expected values.
pub fn match_values(computed: &HostValue, expected: &HostValue) -> Result<()> {
    if computed != expected {
        panic!(
            "Values do not match:\nExpected: {}\nActual: {}",
            expected.render(),
            computed.render()
        );
    }
    Ok(())
}
