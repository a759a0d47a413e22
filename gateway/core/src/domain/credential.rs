// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Credential
//!
//! The single process-wide API key callers must present. Only a SHA-256
//! digest participates in comparisons; the raw value is retained solely so
//! the error normalizer can scrub it from anything echoed back to callers.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Configured API key, loaded once at startup.
#[derive(Clone)]
pub struct Credential {
    digest: [u8; 32],
    raw: String,
}

impl Credential {
    /// Build a credential from its configured value.
    ///
    /// Returns `None` for an empty or whitespace-only value, which the rest
    /// of the system treats as "authentication disabled".
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self {
            digest: digest(raw.as_bytes()),
            raw,
        })
    }

    /// Compare a presented key against this credential.
    ///
    /// Both sides are reduced to fixed-width digests before the constant-time
    /// comparison, so neither the position of the first differing byte nor a
    /// length mismatch changes the work done on the secret side.
    pub fn matches(&self, presented: &[u8]) -> bool {
        let presented = digest(presented);
        presented[..].ct_eq(&self.digest[..]).into()
    }

    pub(crate) fn expose(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Result of checking a request's presented key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Allowed,
    /// No key was presented.
    Missing,
    /// A key was presented but did not match.
    Mismatch,
    /// No credential is configured; every caller is treated as authenticated.
    Disabled,
}

impl AuthOutcome {
    /// Whether the request may proceed.
    pub fn is_permitted(self) -> bool {
        matches!(self, Self::Allowed | Self::Disabled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Missing => "missing",
            Self::Mismatch => "mismatch",
            Self::Disabled => "disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_value_is_not_a_credential() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   ").is_none());
    }

    #[test]
    fn test_matches_exact_value_only() {
        let credential = Credential::new("s3cret-key").unwrap();
        assert!(credential.matches(b"s3cret-key"));
        assert!(!credential.matches(b"s3cret-kez"));
        assert!(!credential.matches(b"s3cret-key-longer"));
        assert!(!credential.matches(b"s3cret"));
        assert!(!credential.matches(b""));
    }

    #[test]
    fn test_debug_never_prints_secret() {
        let credential = Credential::new("hunter2").unwrap();
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("hunter2"));
    }
}
