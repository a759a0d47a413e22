// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration
//
// Values come from an optional YAML file, then CLI flags / environment
// variables layered on top by the binary. Validation happens once, before
// anything is bound or connected.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::domain::credential::Credential;

/// Fatal configuration problems. The process refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("upstream endpoint URL is required")]
    MissingUpstreamUrl,

    #[error("upstream endpoint URL is invalid: {0}")]
    InvalidUpstreamUrl(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream MCP endpoint (streamable HTTP)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,

    /// API key callers must present; absent disables authentication
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// CORS allowed origins; "*" allows any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Hard deadline for graceful shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Timeout for the initial upstream handshake only
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_url: None,
            api_key: None,
            allowed_origins: default_allowed_origins(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upstream_url", &self.upstream_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("allowed_origins", &self.allowed_origins)
            .field("shutdown_timeout_secs", &self.shutdown_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl GatewayConfig {
    /// Load base values from a YAML file. Missing keys take defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Check every field and return the parsed upstream endpoint.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "shutdown_timeout_secs",
                reason: "must be at least one second".to_string(),
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_secs",
                reason: "must be at least one second".to_string(),
            });
        }
        self.upstream_endpoint()
    }

    pub fn upstream_endpoint(&self) -> Result<Url, ConfigError> {
        let raw = self
            .upstream_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingUpstreamUrl)?;

        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUpstreamUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidUpstreamUrl(format!(
                "unsupported scheme '{}'",
                other
            ))),
        }
    }

    /// The configured credential, or `None` when authentication is disabled.
    pub fn credential(&self) -> Option<Credential> {
        self.api_key.as_deref().and_then(Credential::new)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
