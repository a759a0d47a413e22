// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ads-gateway binary support - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Settings resolution and server bootstrap for the `ads-gateway` binary

pub mod server;
pub mod settings;
