// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Upstream Session State
//!
//! Lifecycle states and failure types for the single upstream session.
//!
//! ```text
//! Uninitialized ──> Connecting ──> Ready ──> Closing ──> Closed
//!                        │                     ^
//!                        └──> Failed ──────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Lifecycle state of the upstream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Ready,
    Failed,
    Closing,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Boxed error used for transport failures crossing the domain boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to open the upstream session.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("session cannot be initialized from state {0}")]
    AlreadyInitialized(SessionState),

    #[error("failed to reach upstream: {0}")]
    Transport(#[source] BoxError),

    #[error("upstream rejected the handshake: {0}")]
    Handshake(#[source] UpstreamError),

    #[error("upstream protocol error: {0}")]
    Protocol(String),
}

/// Failure of a single invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("upstream session is not ready (state: {state})")]
    NotReady { state: SessionState },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("upstream transport failure: {0}")]
    Transport(#[source] BoxError),

    #[error("upstream protocol error: {0}")]
    Protocol(String),
}

/// Structured error reported by the upstream service.
///
/// Fixed fields cover what every upstream error carries. `context` collects
/// anything else discovered where the error was first observed; producers
/// skip fields they cannot read instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Error, Serialize)]
#[error("{}", display_message(.message))]
pub struct UpstreamError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

fn display_message(message: &str) -> &str {
    if message.trim().is_empty() {
        "unknown error"
    } else {
        message
    }
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Read a JSON-RPC style error object (`{code, message, data, ...}`).
    ///
    /// Never fails: a non-object becomes an error with an empty message and
    /// the original value under `context.raw`; malformed known fields are
    /// kept in `context` rather than dropped.
    pub fn from_error_object(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default().with_context("raw", value.clone());
        };

        let mut error = Self::default();
        for (key, field) in object {
            match key.as_str() {
                "message" => match field.as_str() {
                    Some(message) => error.message = message.to_string(),
                    None => {
                        error.context.insert(key.clone(), field.clone());
                    }
                },
                "code" => match field.as_i64() {
                    Some(code) => error.code = Some(code),
                    None => {
                        error.context.insert(key.clone(), field.clone());
                    }
                },
                "data" => error.data = Some(field.clone()),
                _ => {
                    error.context.insert(key.clone(), field.clone());
                }
            }
        }
        error
    }

    /// Context flattened into a JSON object, `data` included.
    pub fn context_map(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self
            .context
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(data) = &self.data {
            map.insert("data".to_string(), data.clone());
        }
        map
    }
}
