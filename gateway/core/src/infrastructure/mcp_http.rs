// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// MCP Streamable HTTP Client
//
// Anti-Corruption Layer for the upstream tool service. Speaks JSON-RPC 2.0
// over the MCP streamable HTTP transport:
// - every request is a POST; the reply is either application/json or a
//   buffered text/event-stream carrying the JSON-RPC response
// - the server may assign a session via the Mcp-Session-Id header, which is
//   echoed on every later request and used for DELETE on close
// - tool results are kept as raw JSON text so the gateway can return them
//   byte-for-byte

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::domain::invocation::{Capability, InvocationPayload};
use crate::domain::session::{ConnectError, InvokeError, UpstreamError};
use crate::domain::upstream::{UpstreamConnector, UpstreamHandle};
use crate::infrastructure::sse;

pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const SESSION_HEADER: &str = "mcp-session-id";
const ACCEPT_VALUE: &str = "application/json, text/event-stream";
const CLIENT_NAME: &str = "ads-gateway";
const MAX_LIST_PAGES: usize = 50;
const MAX_ERROR_BODY: usize = 2048;

#[derive(Deserialize)]
struct RpcMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Box<RawValue>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<Capability>,
    #[serde(default)]
    next_cursor: Option<String>,
}

struct Exchange {
    session_id: Option<String>,
    result: Box<RawValue>,
}

/// Opens [`StreamableHttpSession`]s against one endpoint.
pub struct StreamableHttpConnector {
    client: Client,
    endpoint: Url,
    connect_timeout: Duration,
}

impl StreamableHttpConnector {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            connect_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn handshake(&self) -> Result<StreamableHttpSession, ConnectError> {
        let mut session = StreamableHttpSession {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            session_id: None,
            next_id: AtomicU64::new(1),
        };

        let exchange = session
            .exchange(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": CLIENT_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await
            .map_err(into_connect_error)?;

        session.session_id = exchange.session_id;

        let init: Value = serde_json::from_str(exchange.result.get())
            .map_err(|e| ConnectError::Protocol(format!("invalid initialize result: {}", e)))?;
        info!(
            server = %init["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            server_version = %init["serverInfo"]["version"].as_str().unwrap_or("unknown"),
            protocol = %init["protocolVersion"].as_str().unwrap_or(PROTOCOL_VERSION),
            session = session.session_id.is_some(),
            "Upstream handshake complete"
        );

        session
            .notify("notifications/initialized")
            .await
            .map_err(into_connect_error)?;

        Ok(session)
    }
}

fn into_connect_error(error: InvokeError) -> ConnectError {
    match error {
        InvokeError::Transport(e) => ConnectError::Transport(e),
        InvokeError::Upstream(e) => ConnectError::Handshake(e),
        InvokeError::Protocol(message) => ConnectError::Protocol(message),
        InvokeError::NotReady { state } => {
            ConnectError::Protocol(format!("unexpected session state {}", state))
        }
    }
}

/// Endpoint rendered without userinfo or query string.
fn display_endpoint(url: &Url) -> String {
    format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or(""),
        url.port().map(|p| format!(":{}", p)).unwrap_or_default()
    ) + url.path()
}

#[async_trait]
impl UpstreamConnector for StreamableHttpConnector {
    async fn connect(&self) -> Result<Arc<dyn UpstreamHandle>, ConnectError> {
        let session = tokio::time::timeout(self.connect_timeout, self.handshake())
            .await
            .map_err(|_| {
                ConnectError::Protocol(format!(
                    "handshake timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })??;
        Ok(Arc::new(session))
    }

    fn endpoint(&self) -> String {
        display_endpoint(&self.endpoint)
    }
}

/// One live MCP session over streamable HTTP.
pub struct StreamableHttpSession {
    client: Client,
    endpoint: Url,
    session_id: Option<String>,
    next_id: AtomicU64,
}

impl StreamableHttpSession {
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn post(&self, body: &Value) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, ACCEPT_VALUE)
            .json(body);
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id);
        }
        request
    }

    async fn exchange(&self, method: &str, params: Value) -> Result<Exchange, InvokeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(%method, id, "Sending upstream request");

        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|e| InvokeError::Transport(Box::new(e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| InvokeError::Transport(Box::new(e)))?;

        let session_id = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            return Err(http_failure(status, &bytes, self.session_id.as_deref()).into());
        }

        let message = decode_message(&headers, &bytes, id)?;
        if let Some(error) = message.error {
            return Err(UpstreamError::from_error_object(&error).into());
        }
        let result = message
            .result
            .ok_or_else(|| InvokeError::Protocol(format!("{} response has no result", method)))?;

        Ok(Exchange { session_id, result })
    }

    async fn notify(&self, method: &str) -> Result<(), InvokeError> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|e| InvokeError::Transport(Box::new(e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| InvokeError::Transport(Box::new(e)))?;
        Err(http_failure(status, &bytes, self.session_id.as_deref()).into())
    }
}

fn http_failure(status: StatusCode, body: &[u8], session_id: Option<&str>) -> UpstreamError {
    let mut error = serde_json::from_slice::<RpcMessage>(body)
        .ok()
        .and_then(|message| message.error)
        .map(|error| UpstreamError::from_error_object(&error))
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body);
            let excerpt: String = text.chars().take(MAX_ERROR_BODY).collect();
            let error = UpstreamError::new(format!("upstream returned HTTP {}", status.as_u16()));
            if excerpt.trim().is_empty() {
                error
            } else {
                error.with_context("body", excerpt)
            }
        });

    error = error.with_context("httpStatus", status.as_u16());
    if let Some(session_id) = session_id {
        error = error.with_context("sessionId", session_id);
    }
    error
}

fn decode_message(headers: &HeaderMap, body: &[u8], id: u64) -> Result<RpcMessage, InvokeError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_ascii_lowercase();

    if !content_type.starts_with("text/event-stream") {
        return serde_json::from_slice(body)
            .map_err(|e| InvokeError::Protocol(format!("invalid JSON-RPC response: {}", e)));
    }

    let text = std::str::from_utf8(body)
        .map_err(|e| InvokeError::Protocol(format!("event stream is not UTF-8: {}", e)))?;

    let mut fallback = None;
    for event in sse::parse_events(text) {
        let Ok(message) = serde_json::from_str::<RpcMessage>(&event.data) else {
            continue;
        };
        if message.result.is_none() && message.error.is_none() {
            // Server-initiated request or notification.
            continue;
        }
        if message.id.as_ref().and_then(Value::as_u64) == Some(id) {
            return Ok(message);
        }
        if fallback.is_none() {
            fallback = Some(message);
        }
    }

    fallback.ok_or_else(|| InvokeError::Protocol("event stream carried no response".to_string()))
}

#[async_trait]
impl UpstreamHandle for StreamableHttpSession {
    async fn list_capabilities(&self) -> Result<Vec<Capability>, InvokeError> {
        let mut capabilities = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let exchange = self.exchange("tools/list", params).await?;
            let page: ToolsPage = serde_json::from_str(exchange.result.get())
                .map_err(|e| InvokeError::Protocol(format!("invalid tools/list result: {}", e)))?;

            capabilities.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(capabilities),
            }
        }

        Err(InvokeError::Protocol(format!(
            "tools/list did not finish within {} pages",
            MAX_LIST_PAGES
        )))
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<InvocationPayload, InvokeError> {
        let exchange = self
            .exchange("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(InvocationPayload::from_raw(exchange.result))
    }

    async fn close(&self) {
        let Some(session_id) = &self.session_id else {
            return;
        };

        let result = self
            .client
            .delete(self.endpoint.clone())
            .header(SESSION_HEADER, session_id)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Upstream session terminated");
            }
            Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
                debug!("Upstream does not support explicit session termination");
            }
            Ok(response) => {
                debug!(status = %response.status(), "Upstream session termination refused");
            }
            Err(e) => {
                debug!(error = %e, "Upstream session termination failed");
            }
        }
    }
}
