// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Invocation value objects.
//!
//! An [`Invocation`] is one named-capability call forwarded to the upstream
//! session. The gateway never looks inside its arguments or its result.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Per-request correlation token. Diagnostic only; never sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Adopt a caller- or middleware-supplied token.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request to the upstream service. Immutable once built and never
/// retried automatically.
#[derive(Debug, Clone)]
pub struct Invocation {
    name: String,
    arguments: Map<String, Value>,
    correlation_id: CorrelationId,
}

impl Invocation {
    pub fn new(
        name: impl Into<String>,
        arguments: Map<String, Value>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            correlation_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

/// Successful upstream result, held as the exact JSON text the upstream sent.
#[derive(Debug, Clone)]
pub struct InvocationPayload(Box<RawValue>);

impl InvocationPayload {
    pub fn from_raw(raw: Box<RawValue>) -> Self {
        Self(raw)
    }

    /// Wrap a JSON document, rejecting text that is not valid JSON.
    pub fn from_json_text(text: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(text.into()).map(Self)
    }

    /// The payload exactly as received.
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(self.0.get())
    }
}

/// A capability advertised by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,

    /// Any further descriptor fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
