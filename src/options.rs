// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Knobs that change how values and schemas are mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct MappingOptions {
    /// Fill a missing non-optional record field with the zero value of its
    /// type (`""`, `0`, `false`) instead of failing.
    pub falsy_defaults: bool,

    /// Fail schema derivation when two cases of an untagged union accept a
    /// common value. Otherwise the overlap is logged and the first declared
    /// case wins.
    pub reject_ambiguous_unions: bool,

    /// Deserialize `s64`/`u64` into bigints. When off, they become numbers
    /// and may lose precision beyond 2^53.
    pub bigint_for_64bit: bool,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            falsy_defaults: false,
            reject_ambiguous_unions: false,
            bigint_for_64bit: true,
        }
    }
}

impl MappingOptions {
    pub fn from_json_str(json: &str) -> Result<MappingOptions> {
        Ok(serde_json::from_str(json)?)
    }
}
