// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Ads Gateway Core
//!
//! Authenticated REST gateway in front of a single long-lived upstream MCP
//! tool session.
//!
//! # Architecture
//!
//! - **domain:** credentials, session state, invocations, error envelopes,
//!   configuration and the upstream collaborator traits
//! - **application:** credential verification, the upstream session manager,
//!   error normalization, the request gateway and the shutdown coordinator
//! - **infrastructure:** MCP over the streamable HTTP transport
//! - **presentation:** the axum routing table

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
