// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Upstream Tool Service Interface (Anti-Corruption Layer)
//!
//! The gateway depends only on these traits. The streamable HTTP MCP client
//! lives in [`crate::infrastructure::mcp_http`]; tests substitute fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::invocation::{Capability, InvocationPayload};
use crate::domain::session::{ConnectError, InvokeError};

/// Opens connections to the upstream tool service.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    /// Perform the upstream handshake and return a live handle.
    async fn connect(&self) -> Result<Arc<dyn UpstreamHandle>, ConnectError>;

    /// Endpoint description for logs. Must not include credentials.
    fn endpoint(&self) -> String;
}

/// A live connection to the upstream tool service.
#[async_trait]
pub trait UpstreamHandle: Send + Sync {
    /// Enumerate the capabilities the upstream advertises.
    async fn list_capabilities(&self) -> Result<Vec<Capability>, InvokeError>;

    /// Call one capability by name.
    async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<InvocationPayload, InvokeError>;

    /// Release the connection. Failures are the implementation's to log.
    async fn close(&self);
}
