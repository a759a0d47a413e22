// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fakes for the gateway integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Notify;

use ads_gateway_core::application::{
    CredentialVerifier, ErrorNormalizer, RequestGateway, UpstreamSessionManager,
};
use ads_gateway_core::domain::credential::Credential;
use ads_gateway_core::domain::invocation::{Capability, InvocationPayload};
use ads_gateway_core::domain::session::{ConnectError, InvokeError, UpstreamError};
use ads_gateway_core::domain::upstream::{UpstreamConnector, UpstreamHandle};
use ads_gateway_core::presentation::AppState;

pub const API_KEY: &str = "test-secret-key";
pub const DEFAULT_REPLY: &str = r#"{"content":[{"type":"text","text":"ok"}],"isError":false}"#;

enum Reply {
    Payload(String),
    Failure(UpstreamError),
}

/// Upstream handle answering from a per-tool script.
#[derive(Default)]
pub struct ScriptedHandle {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    hold: Option<Arc<Notify>>,
    listing_hold: Option<Arc<Notify>>,
    pub listing_entered: Arc<Notify>,
    pub listings_finished: AtomicUsize,
    pub entered: Arc<Notify>,
    pub finished: Arc<Notify>,
    pub closes: AtomicUsize,
}

impl ScriptedHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, tool: &str, json_text: &str) -> Self {
        self.replies
            .insert(tool.to_string(), Reply::Payload(json_text.to_string()));
        self
    }

    pub fn fail(mut self, tool: &str, error: UpstreamError) -> Self {
        self.replies.insert(tool.to_string(), Reply::Failure(error));
        self
    }

    /// Block every invoke until `gate` is notified.
    pub fn held_by(mut self, gate: Arc<Notify>) -> Self {
        self.hold = Some(gate);
        self
    }

    /// Block capability listings until `gate` is notified. Takes effect
    /// after the listing made by `initialize`.
    pub fn listing_held_by(mut self, gate: Arc<Notify>) -> Self {
        self.listing_hold = Some(gate);
        self
    }

    pub fn listings_finished(&self) -> usize {
        self.listings_finished.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamHandle for ScriptedHandle {
    async fn list_capabilities(&self) -> Result<Vec<Capability>, InvokeError> {
        // The first listing is the session's verification call during initialize.
        if self.listings_finished.load(Ordering::SeqCst) > 0 {
            if let Some(gate) = &self.listing_hold {
                self.listing_entered.notify_one();
                gate.notified().await;
            }
        }
        self.listings_finished.fetch_add(1, Ordering::SeqCst);

        Ok(["list_accounts", "execute_gaql_query", "get_campaign_performance"]
            .iter()
            .map(|name| Capability {
                name: name.to_string(),
                description: Some(format!("{} tool", name)),
                input_schema: None,
                extra: Map::new(),
            })
            .collect())
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<InvocationPayload, InvokeError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        self.entered.notify_one();
        if let Some(gate) = &self.hold {
            gate.notified().await;
        }
        self.finished.notify_one();

        match self.replies.get(name) {
            Some(Reply::Payload(text)) => Ok(InvocationPayload::from_json_text(text.clone()).unwrap()),
            Some(Reply::Failure(error)) => Err(error.clone().into()),
            None => Ok(InvocationPayload::from_json_text(DEFAULT_REPLY).unwrap()),
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct StaticConnector {
    handle: Arc<ScriptedHandle>,
}

impl StaticConnector {
    pub fn new(handle: Arc<ScriptedHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl UpstreamConnector for StaticConnector {
    async fn connect(&self) -> Result<Arc<dyn UpstreamHandle>, ConnectError> {
        Ok(self.handle.clone())
    }

    fn endpoint(&self) -> String {
        "fake://ads-upstream".to_string()
    }
}

/// Application state over `handle`, with the session not yet initialized.
pub fn app_state(handle: Arc<ScriptedHandle>, api_key: Option<&str>) -> AppState {
    let sessions = Arc::new(UpstreamSessionManager::new(Arc::new(StaticConnector::new(
        handle,
    ))));
    let credential = api_key.and_then(Credential::new);
    let normalizer = ErrorNormalizer::new(credential.as_ref());
    AppState {
        gateway: Arc::new(RequestGateway::new(sessions.clone(), normalizer)),
        sessions,
        verifier: Arc::new(CredentialVerifier::new(credential)),
    }
}

/// Application state with a ready upstream session.
pub async fn ready_state(handle: Arc<ScriptedHandle>, api_key: Option<&str>) -> AppState {
    let state = app_state(handle, api_key);
    state.sessions.initialize().await.unwrap();
    state
}
