// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Upstream Session Manager
//!
//! Owns the single upstream session for the lifetime of the process and is
//! the only component that mutates it.
//!
//! ## Invariants
//!
//! - At most one session exists; every invocation shares it.
//! - The state lock is never held across an await. Callers therefore never
//!   wait on a connect or close in flight: anything other than `Ready`
//!   answers `NotReady` immediately.
//! - A handle is published only once its connect has completed, and is
//!   withdrawn before its close starts.
//! - A failed post-connect verification probe is recorded in `last_error`
//!   but leaves the session `Ready`.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::invocation::{Capability, Invocation, InvocationPayload};
use crate::domain::session::{ConnectError, InvokeError, SessionState};
use crate::domain::upstream::{UpstreamConnector, UpstreamHandle};

struct SessionSlot {
    state: SessionState,
    handle: Option<Arc<dyn UpstreamHandle>>,
    last_error: Option<String>,
    capability_count: Option<usize>,
}

/// Point-in-time view of the session for health reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_count: Option<usize>,
}

pub struct UpstreamSessionManager {
    connector: Arc<dyn UpstreamConnector>,
    slot: Mutex<SessionSlot>,
}

impl UpstreamSessionManager {
    pub fn new(connector: Arc<dyn UpstreamConnector>) -> Self {
        Self {
            connector,
            slot: Mutex::new(SessionSlot {
                state: SessionState::Uninitialized,
                handle: None,
                last_error: None,
                capability_count: None,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.slot.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let slot = self.slot.lock();
        SessionSnapshot {
            state: slot.state,
            last_error: slot.last_error.clone(),
            capability_count: slot.capability_count,
        }
    }

    /// Open the upstream session. Runs once; any later call fails with
    /// [`ConnectError::AlreadyInitialized`].
    pub async fn initialize(&self) -> Result<(), ConnectError> {
        {
            let mut slot = self.slot.lock();
            if slot.state != SessionState::Uninitialized {
                return Err(ConnectError::AlreadyInitialized(slot.state));
            }
            slot.state = SessionState::Connecting;
        }

        info!(endpoint = %self.connector.endpoint(), "Connecting to upstream tool service");

        let handle = match self.connector.connect().await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Upstream connection failed");
                let mut slot = self.slot.lock();
                slot.state = SessionState::Failed;
                slot.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        {
            let mut slot = self.slot.lock();
            slot.handle = Some(handle.clone());
            slot.state = SessionState::Ready;
        }
        metrics::gauge!("gateway_upstream_ready").set(1.0);

        // Verification probe. Failure is logged, not fatal.
        match handle.list_capabilities().await {
            Ok(capabilities) => {
                info!(
                    capabilities = capabilities.len(),
                    "Upstream session ready"
                );
                self.slot.lock().capability_count = Some(capabilities.len());
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Upstream verification probe failed; serving with unconfirmed session health"
                );
                self.slot.lock().last_error = Some(e.to_string());
            }
        }

        Ok(())
    }

    fn ready_handle(&self) -> Result<Arc<dyn UpstreamHandle>, InvokeError> {
        let slot = self.slot.lock();
        match (slot.state, &slot.handle) {
            (SessionState::Ready, Some(handle)) => Ok(handle.clone()),
            (state, _) => Err(InvokeError::NotReady { state }),
        }
    }

    fn record_failure(&self, error: &InvokeError) {
        if !matches!(error, InvokeError::NotReady { .. }) {
            self.slot.lock().last_error = Some(error.to_string());
        }
    }

    /// Forward one invocation. Never queues: a session that is not `Ready`
    /// yields [`InvokeError::NotReady`] straight away.
    pub async fn invoke(&self, invocation: &Invocation) -> Result<InvocationPayload, InvokeError> {
        let handle = self.ready_handle()?;

        debug!(
            tool = %invocation.name(),
            request_id = %invocation.correlation_id(),
            "Forwarding invocation upstream"
        );

        let result = handle
            .invoke(invocation.name(), invocation.arguments())
            .await;

        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    pub async fn list_capabilities(&self) -> Result<Vec<Capability>, InvokeError> {
        let handle = self.ready_handle()?;
        let result = handle.list_capabilities().await;
        match &result {
            Ok(capabilities) => self.slot.lock().capability_count = Some(capabilities.len()),
            Err(e) => self.record_failure(e),
        }
        result
    }

    /// Close the session. Idempotent: closing a session that is already
    /// closed, closing, or was never opened does nothing.
    pub async fn close(&self) {
        let handle = {
            let mut slot = self.slot.lock();
            match slot.state {
                SessionState::Ready | SessionState::Failed => {
                    slot.state = SessionState::Closing;
                    slot.handle.take()
                }
                state => {
                    debug!(%state, "Session close skipped");
                    return;
                }
            }
        };

        metrics::gauge!("gateway_upstream_ready").set(0.0);

        if let Some(handle) = handle {
            info!("Closing upstream session");
            handle.close().await;
        }

        self.slot.lock().state = SessionState::Closed;
        info!("Upstream session closed");
    }
}
