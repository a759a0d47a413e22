// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP routing table.
//!
//! Thin: every handler parses, delegates to [`RequestGateway`] and renders.
//! Protected routes sit behind [`require_api_key`].

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequestParts, MatchedPath, Path, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::application::auth::CredentialVerifier;
use crate::application::gateway::{self, GatewayError, RequestGateway};
use crate::application::session_manager::UpstreamSessionManager;
use crate::domain::credential::AuthOutcome;
use crate::domain::error_envelope::ErrorKind;
use crate::domain::invocation::{CorrelationId, InvocationPayload};

const REQUEST_ID_HEADER: &str = "x-request-id";
const API_KEY_HEADER: &str = "x-api-key";

/// The published endpoint surface, listed in 404 responses.
pub const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/tools",
    "POST /api/tools/{name}",
    "GET /api/accounts",
    "POST /api/gaql",
    "POST /api/campaigns/performance",
];

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<RequestGateway>,
    pub sessions: Arc<UpstreamSessionManager>,
    pub verifier: Arc<CredentialVerifier>,
}

pub fn app(state: AppState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}", post(call_tool))
        .route("/api/accounts", get(list_accounts))
        .route("/api/gaql", post(execute_gaql))
        .route("/api/campaigns/performance", post(campaign_performance))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .fallback(not_found)
        .layer(middleware::from_fn(record_request))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(API_KEY_HEADER),
        ])
        .expose_headers([header::HeaderName::from_static(REQUEST_ID_HEADER)]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Correlation token for the current request, taken from `x-request-id`.
pub struct RequestCorrelation(pub CorrelationId);

impl<S: Send + Sync> FromRequestParts<S> for RequestCorrelation {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(correlation_from_headers(&parts.headers)))
    }
}

fn correlation_from_headers(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(CorrelationId::from_token)
        .unwrap_or_default()
}

/// The key a caller presented: a non-empty `x-api-key`, else `Authorization: Bearer`.
fn presented_key(headers: &HeaderMap) -> Option<&[u8]> {
    if let Some(value) = headers.get(API_KEY_HEADER).filter(|v| !v.is_empty()) {
        return Some(value.as_bytes());
    }

    let value = headers.get(header::AUTHORIZATION)?.as_bytes();
    const BEARER: &[u8] = b"bearer ";
    if value.len() >= BEARER.len() && value[..BEARER.len()].eq_ignore_ascii_case(BEARER) {
        Some(&value[BEARER.len()..])
    } else {
        Some(value)
    }
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let outcome = state.verifier.verify(presented_key(request.headers()));

    let rejection = match outcome {
        AuthOutcome::Allowed | AuthOutcome::Disabled => return next.run(request).await,
        AuthOutcome::Missing => GatewayError::MissingCredential,
        AuthOutcome::Mismatch => GatewayError::InvalidCredential,
    };

    metrics::counter!("gateway_auth_rejections_total", "reason" => outcome.as_str()).increment(1);
    warn!(
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %correlation_from_headers(request.headers()),
        outcome = outcome.as_str(),
        "Rejected unauthenticated request"
    );
    rejection.into_response()
}

async fn record_request(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    let status = response.status();
    let outcome = if status.is_success() {
        "success"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "server_error"
    };
    metrics::counter!("gateway_requests_total", "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
    response
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoints: Option<Vec<&'static str>>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            GatewayError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: Some(message.clone()),
                    error: message,
                    ..Default::default()
                },
            ),
            GatewayError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "API key required".to_string(),
                    message: Some(
                        "send the key in the x-api-key header or as an Authorization bearer token"
                            .to_string(),
                    ),
                    ..Default::default()
                },
            ),
            GatewayError::InvalidCredential => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    error: "Invalid API key".to_string(),
                    message: Some("the presented API key was not accepted".to_string()),
                    ..Default::default()
                },
            ),
            GatewayError::NotReady {
                state,
                correlation_id,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: "Upstream session not ready".to_string(),
                    message: Some(format!("session state is {}", state)),
                    request_id: Some(correlation_id.to_string()),
                    ..Default::default()
                },
            ),
            GatewayError::Upstream {
                envelope,
                correlation_id,
            } => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    error: "Upstream invocation failed".to_string(),
                    message: Some(envelope.message),
                    kind: Some(envelope.kind),
                    code: envelope.code,
                    request_id: Some(correlation_id.to_string()),
                    details: envelope.diagnostic_data,
                    ..Default::default()
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Upstream payload returned as received.
fn payload_response(payload: InvocationPayload) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        payload.as_str().to_owned(),
    )
        .into_response()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.sessions.snapshot();
    let ready = state.sessions.is_ready();
    Json(json!({
        "status": if ready { "ok" } else { "degraded" },
        "upstreamReady": ready,
        "sessionState": snapshot.state,
        "lastError": snapshot.last_error,
        "authEnabled": state.verifier.is_enabled(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn list_tools(
    State(state): State<AppState>,
    RequestCorrelation(correlation_id): RequestCorrelation,
) -> Result<Json<Value>, GatewayError> {
    let tools = state.gateway.capabilities(correlation_id).await?;
    Ok(Json(json!({ "tools": tools })))
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RequestCorrelation(correlation_id): RequestCorrelation,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let arguments = gateway::parse_object_body(&body)?;
    let invocation = gateway::tool_invocation(&name, arguments, correlation_id)?;
    let payload = state.gateway.dispatch(invocation).await?;
    Ok(payload_response(payload))
}

async fn list_accounts(
    State(state): State<AppState>,
    RequestCorrelation(correlation_id): RequestCorrelation,
) -> Result<Response, GatewayError> {
    let invocation = gateway::list_accounts_invocation(correlation_id);
    let payload = state.gateway.dispatch(invocation).await?;
    Ok(payload_response(payload))
}

async fn execute_gaql(
    State(state): State<AppState>,
    RequestCorrelation(correlation_id): RequestCorrelation,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let body = gateway::parse_object_body(&body)?;
    let invocation = gateway::gaql_invocation(&body, correlation_id)?;
    let payload = state.gateway.dispatch(invocation).await?;
    Ok(payload_response(payload))
}

async fn campaign_performance(
    State(state): State<AppState>,
    RequestCorrelation(correlation_id): RequestCorrelation,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let body = gateway::parse_object_body(&body)?;
    let invocation = gateway::campaign_performance_invocation(&body, correlation_id)?;
    let payload = state.gateway.dispatch(invocation).await?;
    Ok(payload_response(payload))
}

async fn not_found(method: Method, uri: Uri) -> Response {
    let body = ErrorBody {
        error: "Not found".to_string(),
        message: Some(format!("no route for {} {}", method, uri.path())),
        endpoints: Some(ENDPOINTS.to_vec()),
        ..Default::default()
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
