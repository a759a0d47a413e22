// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain types for the gateway.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Value objects and collaborator traits shared by every other layer

pub mod config;
pub mod credential;
pub mod error_envelope;
pub mod invocation;
pub mod session;
pub mod upstream;
