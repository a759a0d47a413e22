// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Error Normalizer
//!
//! Turns any error reaching the request boundary into an [`ErrorEnvelope`].
//!
//! - Known error types are classified by kind; anything else is `Unknown`.
//! - An empty or unreadable message becomes `"unknown error"`.
//! - The `source()` chain is captured into `diagnosticData.causes`. A level
//!   whose `Display` panics is skipped instead of taking the request down.
//! - Stack traces are dropped and the configured credential is scrubbed from
//!   every string that ends up in the envelope.

use std::error::Error as StdError;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{Map, Value};

use crate::domain::credential::Credential;
use crate::domain::error_envelope::{ErrorEnvelope, ErrorKind, UNKNOWN_ERROR_MESSAGE};
use crate::domain::session::{ConnectError, InvokeError, UpstreamError};

const REDACTED: &str = "[REDACTED]";
const STACK_KEYS: &[&str] = &["stack", "stacktrace", "stack_trace", "backtrace"];
const SECRET_KEYS: &[&str] = &["authorization", "x-api-key", "api_key", "apikey"];
const MAX_CAUSES: usize = 16;

pub struct ErrorNormalizer {
    secret: Option<String>,
}

impl ErrorNormalizer {
    pub fn new(credential: Option<&Credential>) -> Self {
        Self {
            secret: credential.map(|c| c.expose().to_string()),
        }
    }

    pub fn normalize(&self, error: &(dyn StdError + 'static)) -> ErrorEnvelope {
        let mut envelope = classify(error);

        let causes = collect_causes(error);
        if !causes.is_empty() {
            envelope
                .diagnostic_data
                .get_or_insert_with(Map::new)
                .insert("causes".to_string(), Value::from(causes));
        }

        if envelope.message.trim().is_empty() {
            envelope.message = UNKNOWN_ERROR_MESSAGE.to_string();
        }

        self.sanitize(envelope)
    }

    fn sanitize(&self, mut envelope: ErrorEnvelope) -> ErrorEnvelope {
        envelope.message = self.redact(&envelope.message);
        envelope.code = envelope.code.map(|code| self.redact(&code));
        if let Some(data) = envelope.diagnostic_data.as_mut() {
            self.scrub_object(data);
            if data.is_empty() {
                envelope.diagnostic_data = None;
            }
        }
        envelope
    }

    fn redact(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) if text.contains(secret.as_str()) => text.replace(secret.as_str(), REDACTED),
            _ => text.to_string(),
        }
    }

    fn scrub_object(&self, map: &mut Map<String, Value>) {
        map.retain(|key, _| !is_one_of(key, STACK_KEYS));
        for (key, value) in map.iter_mut() {
            if is_one_of(key, SECRET_KEYS) {
                *value = Value::from(REDACTED);
            } else {
                self.scrub(value);
            }
        }
    }

    fn scrub(&self, value: &mut Value) {
        match value {
            Value::String(text) => *text = self.redact(text),
            Value::Array(items) => items.iter_mut().for_each(|item| self.scrub(item)),
            Value::Object(map) => self.scrub_object(map),
            _ => {}
        }
    }
}

fn is_one_of(key: &str, names: &[&str]) -> bool {
    names.iter().any(|name| key.eq_ignore_ascii_case(name))
}

fn safe_display(error: &dyn StdError) -> Option<String> {
    catch_unwind(AssertUnwindSafe(|| error.to_string())).ok()
}

fn classify(error: &(dyn StdError + 'static)) -> ErrorEnvelope {
    if let Some(e) = error.downcast_ref::<InvokeError>() {
        return classify_invoke(e);
    }
    if let Some(e) = error.downcast_ref::<UpstreamError>() {
        return from_upstream(e);
    }
    if let Some(e) = error.downcast_ref::<ConnectError>() {
        let kind = match e {
            ConnectError::Transport(_) => ErrorKind::Transport,
            ConnectError::Handshake(inner) => return from_upstream(inner),
            ConnectError::Protocol(_) | ConnectError::AlreadyInitialized(_) => ErrorKind::Protocol,
        };
        return ErrorEnvelope::new(kind, safe_display(e).unwrap_or_default());
    }

    match safe_display(error) {
        Some(message) => ErrorEnvelope::new(ErrorKind::Unknown, message),
        None => ErrorEnvelope::unknown(),
    }
}

fn classify_invoke(error: &InvokeError) -> ErrorEnvelope {
    match error {
        InvokeError::NotReady { state } => {
            let mut envelope =
                ErrorEnvelope::new(ErrorKind::NotReady, "upstream session is not ready");
            let mut data = Map::new();
            data.insert("sessionState".to_string(), Value::from(state.to_string()));
            envelope.diagnostic_data = Some(data);
            envelope
        }
        InvokeError::Upstream(e) => from_upstream(e),
        InvokeError::Transport(_) => {
            ErrorEnvelope::new(ErrorKind::Transport, safe_display(error).unwrap_or_default())
        }
        InvokeError::Protocol(_) => {
            ErrorEnvelope::new(ErrorKind::Protocol, safe_display(error).unwrap_or_default())
        }
    }
}

fn from_upstream(error: &UpstreamError) -> ErrorEnvelope {
    let mut envelope = ErrorEnvelope::new(ErrorKind::Upstream, error.message.clone());
    envelope.code = error.code.map(|code| code.to_string());
    let context = error.context_map();
    if !context.is_empty() {
        envelope.diagnostic_data = Some(context);
    }
    envelope
}

fn collect_causes(error: &(dyn StdError + 'static)) -> Vec<String> {
    let mut causes: Vec<String> = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        if causes.len() >= MAX_CAUSES {
            break;
        }
        if let Some(text) = safe_display(cause) {
            if !text.is_empty() && causes.last() != Some(&text) {
                causes.push(text);
            }
        }
        current = cause.source();
    }
    causes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionState;
    use serde_json::json;
    use std::fmt;

    #[derive(Debug)]
    struct Silent;

    impl fmt::Display for Silent {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Ok(())
        }
    }

    impl StdError for Silent {}

    #[derive(Debug)]
    struct Explosive;

    impl fmt::Display for Explosive {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("display exploded")
        }
    }

    impl StdError for Explosive {}

    #[derive(Debug)]
    struct Wrapper {
        inner: Explosive,
    }

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("wrapper failed")
        }
    }

    impl StdError for Wrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.inner)
        }
    }

    fn normalizer(secret: Option<&str>) -> ErrorNormalizer {
        let credential = secret.and_then(Credential::new);
        ErrorNormalizer::new(credential.as_ref())
    }

    #[test]
    fn test_empty_message_falls_back_to_unknown() {
        let envelope = normalizer(None).normalize(&Silent);
        assert_eq!(envelope.kind, ErrorKind::Unknown);
        assert_eq!(envelope.message, "unknown error");
    }

    #[test]
    fn test_panicking_display_is_contained() {
        let envelope = normalizer(None).normalize(&Explosive);
        assert_eq!(envelope.kind, ErrorKind::Unknown);
        assert_eq!(envelope.message, "unknown error");

        let envelope = normalizer(None).normalize(&Wrapper { inner: Explosive });
        assert_eq!(envelope.message, "wrapper failed");
        assert!(envelope.diagnostic_data.is_none());
    }

    #[test]
    fn test_upstream_error_fields() {
        let error: InvokeError = UpstreamError::from_error_object(&json!({
            "code": -32602,
            "message": "Invalid customer",
            "data": {"customerId": "123", "stack": "at foo (bar.js:1)"},
            "stackTrace": "frames..."
        }))
        .into();

        let envelope = normalizer(None).normalize(&error);
        assert_eq!(envelope.kind, ErrorKind::Upstream);
        assert_eq!(envelope.message, "Invalid customer");
        assert_eq!(envelope.code.as_deref(), Some("-32602"));

        let data = envelope.diagnostic_data.unwrap();
        assert_eq!(data["data"]["customerId"], "123");
        assert!(data["data"].get("stack").is_none());
        assert!(data.get("stackTrace").is_none());
    }

    #[test]
    fn test_not_ready_kind() {
        let error = InvokeError::NotReady {
            state: SessionState::Connecting,
        };
        let envelope = normalizer(None).normalize(&error);
        assert_eq!(envelope.kind, ErrorKind::NotReady);
        assert_eq!(
            envelope.diagnostic_data.unwrap()["sessionState"],
            json!("connecting")
        );
    }

    #[test]
    fn test_transport_captures_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let error = InvokeError::Transport(Box::new(io));

        let envelope = normalizer(None).normalize(&error);
        assert_eq!(envelope.kind, ErrorKind::Transport);
        assert!(envelope.message.contains("peer reset"));
        assert_eq!(
            envelope.diagnostic_data.unwrap()["causes"],
            json!(["peer reset"])
        );
    }

    #[test]
    fn test_credential_never_transcribed() {
        let error: InvokeError = UpstreamError::new("bad key sk-live-123 rejected")
            .with_context("echo", json!({"authorization": "Bearer sk-live-123", "note": "sk-live-123"}))
            .into();

        let envelope = normalizer(Some("sk-live-123")).normalize(&error);
        let rendered = serde_json::to_string(&envelope).unwrap();
        assert!(!rendered.contains("sk-live-123"));
        assert_eq!(envelope.message, "bad key [REDACTED] rejected");
    }
}
