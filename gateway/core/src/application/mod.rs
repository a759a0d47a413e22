// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod auth;
pub mod error_normalizer;
pub mod gateway;
pub mod session_manager;
pub mod shutdown;

pub use auth::CredentialVerifier;
pub use error_normalizer::ErrorNormalizer;
pub use gateway::{GatewayError, RequestGateway};
pub use session_manager::{SessionSnapshot, UpstreamSessionManager};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome};
