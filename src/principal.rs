// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

use crate::host::HostValue;

/// Identity of the caller of an agent method.
///
/// Parameters typed as a principal are never part of a schema; the runtime
/// injects the caller when it invokes the method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Principal {
    Oidc(OidcPrincipal),
    Agent(AgentPrincipal),
    User(UserPrincipal),
    #[default]
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcPrincipal {
    pub sub: String,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPrincipal {
    pub agent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPrincipal {
    pub account_id: String,
}

impl Principal {
    /// Host spelling: `{ tag, val }` with camel-cased payload properties.
    pub fn to_host(&self) -> HostValue {
        let (tag, val) = match self {
            Principal::Oidc(p) => {
                let mut entries = vec![
                    ("sub", HostValue::from(p.sub.as_str())),
                    ("issuer", HostValue::from(p.issuer.as_str())),
                ];
                if let Some(email) = &p.email {
                    entries.push(("email", HostValue::from(email.as_str())));
                }
                if let Some(name) = &p.name {
                    entries.push(("name", HostValue::from(name.as_str())));
                }
                ("oidc", Some(HostValue::object(entries)))
            }
            Principal::Agent(p) => (
                "agent",
                Some(HostValue::object([(
                    "agentId",
                    HostValue::from(p.agent_id.as_str()),
                )])),
            ),
            Principal::User(p) => (
                "user",
                Some(HostValue::object([(
                    "accountId",
                    HostValue::from(p.account_id.as_str()),
                )])),
            ),
            Principal::Anonymous => ("anonymous", None),
        };

        let mut entries = vec![("tag", HostValue::from(tag))];
        if let Some(val) = val {
            entries.push(("val", val));
        }
        HostValue::object(entries)
    }
}
