// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Stable, serializable error description returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_ERROR_MESSAGE: &str = "unknown error";

/// Broad class of a normalized error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotReady,
    Upstream,
    Transport,
    Protocol,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub message: String,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_data: Option<Map<String, Value>>,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            code: None,
            diagnostic_data: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(ErrorKind::Unknown, UNKNOWN_ERROR_MESSAGE)
    }
}
