// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Request Gateway
//!
//! Per-endpoint request handling independent of the HTTP framework:
//!
//! ```text
//! request body ──> validate ──> exactly one Invocation
//!                                   └─ UpstreamSessionManager::invoke
//!                                         ├─ Ok(payload)   → passed through untouched
//!                                         ├─ NotReady      → GatewayError::NotReady
//!                                         └─ other error   → ErrorNormalizer → GatewayError::Upstream
//! ```
//!
//! Upstream-reported logical errors inside a successful payload (e.g.
//! `{"isError": true}`) are not reinterpreted; they are still a success here.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::application::error_normalizer::ErrorNormalizer;
use crate::application::session_manager::UpstreamSessionManager;
use crate::domain::error_envelope::ErrorEnvelope;
use crate::domain::invocation::{Capability, CorrelationId, Invocation, InvocationPayload};
use crate::domain::session::{InvokeError, SessionState};

pub const LIST_ACCOUNTS_TOOL: &str = "list_accounts";
pub const EXECUTE_GAQL_TOOL: &str = "execute_gaql_query";
pub const CAMPAIGN_PERFORMANCE_TOOL: &str = "get_campaign_performance";

const DEFAULT_PERFORMANCE_DAYS: i64 = 30;
const MAX_PERFORMANCE_DAYS: i64 = 365;

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("API key required")]
    MissingCredential,

    #[error("Invalid API key")]
    InvalidCredential,

    #[error("upstream session is not ready (state: {state})")]
    NotReady {
        state: SessionState,
        correlation_id: CorrelationId,
    },

    #[error("upstream invocation failed: {}", .envelope.message)]
    Upstream {
        envelope: ErrorEnvelope,
        correlation_id: CorrelationId,
    },
}

impl GatewayError {
    fn required(field: &str) -> Self {
        Self::Validation(format!("{} is required", field))
    }
}

pub struct RequestGateway {
    sessions: Arc<UpstreamSessionManager>,
    normalizer: ErrorNormalizer,
}

impl RequestGateway {
    pub fn new(sessions: Arc<UpstreamSessionManager>, normalizer: ErrorNormalizer) -> Self {
        Self {
            sessions,
            normalizer,
        }
    }

    /// Forward one invocation and map its outcome.
    pub async fn dispatch(&self, invocation: Invocation) -> Result<InvocationPayload, GatewayError> {
        let tool = invocation.name().to_owned();
        let correlation_id = invocation.correlation_id().clone();
        let sessions = self.sessions.clone();

        self.run_detached(&tool, correlation_id, async move {
            sessions.invoke(&invocation).await
        })
        .await
    }

    /// Capability listing; counts as the endpoint's one upstream call.
    pub async fn capabilities(
        &self,
        correlation_id: CorrelationId,
    ) -> Result<Vec<Capability>, GatewayError> {
        let sessions = self.sessions.clone();

        self.run_detached("tools/list", correlation_id, async move {
            sessions.list_capabilities().await
        })
        .await
    }

    /// Drive an upstream call on its own task: if the caller goes away the
    /// call still runs to completion and its result is discarded.
    async fn run_detached<T, F>(
        &self,
        tool: &str,
        correlation_id: CorrelationId,
        call: F,
    ) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, InvokeError>> + Send + 'static,
    {
        match tokio::spawn(call).await {
            Ok(Ok(value)) => {
                metrics::counter!("gateway_upstream_invocations_total", "outcome" => "success")
                    .increment(1);
                Ok(value)
            }
            Ok(Err(e)) => Err(self.map_failure(e, tool, &correlation_id)),
            Err(join_error) => {
                metrics::counter!("gateway_upstream_invocations_total", "outcome" => "error")
                    .increment(1);
                let envelope = self.normalizer.normalize(&join_error);
                error!(%tool, request_id = %correlation_id, error = %envelope.message, "Upstream call task aborted");
                Err(GatewayError::Upstream {
                    envelope,
                    correlation_id,
                })
            }
        }
    }

    fn map_failure(
        &self,
        error: InvokeError,
        tool: &str,
        correlation_id: &CorrelationId,
    ) -> GatewayError {
        if let InvokeError::NotReady { state } = error {
            metrics::counter!("gateway_upstream_invocations_total", "outcome" => "not_ready")
                .increment(1);
            warn!(%tool, request_id = %correlation_id, %state, "Rejected invocation: upstream not ready");
            return GatewayError::NotReady {
                state,
                correlation_id: correlation_id.clone(),
            };
        }

        metrics::counter!("gateway_upstream_invocations_total", "outcome" => "error").increment(1);
        let envelope = self.normalizer.normalize(&error);
        warn!(
            %tool,
            request_id = %correlation_id,
            kind = ?envelope.kind,
            error = %envelope.message,
            "Upstream invocation failed"
        );
        GatewayError::Upstream {
            envelope,
            correlation_id: correlation_id.clone(),
        }
    }
}

/// Parse a request body that must be a JSON object. Empty means `{}`.
pub fn parse_object_body(body: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(GatewayError::Validation(
            "request body must be a JSON object".to_string(),
        )),
    }
}

/// A required, non-blank string field, returned exactly as sent.
fn required_string(body: &Map<String, Value>, field: &str) -> Result<String, GatewayError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(GatewayError::required(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(GatewayError::required(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(GatewayError::Validation(format!("{} must be a string", field))),
    }
}

/// Customer IDs are accepted as strings (dashes allowed) or integers.
fn customer_id(body: &Map<String, Value>) -> Result<String, GatewayError> {
    let raw = match body.get("customer_id") {
        Some(Value::Number(n)) if n.is_u64() => n.to_string(),
        _ => required_string(body, "customer_id")?,
    };
    let normalized: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if normalized.is_empty() {
        return Err(GatewayError::required("customer_id"));
    }
    if !normalized.chars().all(|c| c.is_ascii_digit()) {
        return Err(GatewayError::Validation(
            "customer_id must contain only digits and dashes".to_string(),
        ));
    }
    Ok(normalized)
}

pub fn list_accounts_invocation(correlation_id: CorrelationId) -> Invocation {
    Invocation::new(LIST_ACCOUNTS_TOOL, Map::new(), correlation_id)
}

pub fn gaql_invocation(
    body: &Map<String, Value>,
    correlation_id: CorrelationId,
) -> Result<Invocation, GatewayError> {
    let customer_id = customer_id(body)?;
    let query = required_string(body, "query")?;

    let mut arguments = Map::new();
    arguments.insert("customer_id".to_string(), Value::from(customer_id));
    arguments.insert("query".to_string(), Value::from(query));
    Ok(Invocation::new(EXECUTE_GAQL_TOOL, arguments, correlation_id))
}

pub fn campaign_performance_invocation(
    body: &Map<String, Value>,
    correlation_id: CorrelationId,
) -> Result<Invocation, GatewayError> {
    let customer_id = customer_id(body)?;
    let days = match body.get("days") {
        None | Some(Value::Null) => DEFAULT_PERFORMANCE_DAYS,
        Some(value) => value
            .as_i64()
            .filter(|d| (1..=MAX_PERFORMANCE_DAYS).contains(d))
            .ok_or_else(|| {
                GatewayError::Validation(format!(
                    "days must be an integer between 1 and {}",
                    MAX_PERFORMANCE_DAYS
                ))
            })?,
    };

    let mut arguments = Map::new();
    arguments.insert("customer_id".to_string(), Value::from(customer_id));
    arguments.insert("days".to_string(), Value::from(days));
    Ok(Invocation::new(CAMPAIGN_PERFORMANCE_TOOL, arguments, correlation_id))
}

/// Generic pass-through: the body object becomes the arguments verbatim.
pub fn tool_invocation(
    name: &str,
    body: Map<String, Value>,
    correlation_id: CorrelationId,
) -> Result<Invocation, GatewayError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatewayError::required("tool name"));
    }
    Ok(Invocation::new(name, body, correlation_id))
}
