// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Credential Verifier
//!
//! Decides whether a request's presented API key grants access. Stateless
//! apart from the configured credential: the same input always yields the
//! same [`AuthOutcome`].

use tracing::warn;

use crate::domain::credential::{AuthOutcome, Credential};

pub struct CredentialVerifier {
    credential: Option<Credential>,
}

impl CredentialVerifier {
    /// Create the verifier. Emits the standing "authentication disabled"
    /// warning once when no credential is configured.
    pub fn new(credential: Option<Credential>) -> Self {
        if credential.is_none() {
            warn!(
                "No API key configured: authentication is DISABLED and every protected endpoint is open"
            );
        }
        Self { credential }
    }

    pub fn is_enabled(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Check a presented key.
    ///
    /// Works on raw header bytes so there is no decoding step that could fail
    /// differently from a plain mismatch.
    pub fn verify(&self, presented: Option<&[u8]>) -> AuthOutcome {
        let Some(credential) = &self.credential else {
            return AuthOutcome::Disabled;
        };

        match presented {
            None => AuthOutcome::Missing,
            Some(key) if key.is_empty() => AuthOutcome::Missing,
            Some(key) if credential.matches(key) => AuthOutcome::Allowed,
            Some(_) => AuthOutcome::Mismatch,
        }
    }
}
