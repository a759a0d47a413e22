// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod mcp_http;
pub mod sse;

pub use mcp_http::{StreamableHttpConnector, StreamableHttpSession};
