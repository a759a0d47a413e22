// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Settings resolution: YAML file as the base, flags and environment on top.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ads_gateway_core::domain::config::GatewayConfig;

/// Server options. Unset values fall back to the config file, then defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct GatewayArgs {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG_PATH", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// HTTP listen host (default: 0.0.0.0)
    #[arg(long, env = "GATEWAY_HOST")]
    pub host: Option<String>,

    /// HTTP listen port (default: 8080; `PORT` is also honoured)
    #[arg(long, env = "GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Upstream MCP endpoint (streamable HTTP)
    #[arg(long, env = "GATEWAY_UPSTREAM_URL", value_name = "URL")]
    pub upstream_url: Option<String>,

    /// API key callers must present. Omit to disable authentication.
    #[arg(long, env = "GATEWAY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Comma-separated CORS origins; `*` allows any
    #[arg(long, env = "GATEWAY_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,

    /// Hard deadline for graceful shutdown, in seconds (default: 10)
    #[arg(long, env = "GATEWAY_SHUTDOWN_TIMEOUT_SECS")]
    pub shutdown_timeout_secs: Option<u64>,

    /// Timeout for the initial upstream handshake, in seconds (default: 30)
    #[arg(long, env = "GATEWAY_CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,
}

impl GatewayArgs {
    /// Merge file values and overrides into a validated [`GatewayConfig`].
    pub fn resolve(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => GatewayConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port.map(Ok).or_else(port_from_env).transpose()? {
            config.port = port;
        }
        if let Some(url) = &self.upstream_url {
            config.upstream_url = Some(url.clone());
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(origins) = &self.allowed_origins {
            config.allowed_origins = origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(secs) = self.shutdown_timeout_secs {
            config.shutdown_timeout_secs = secs;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout_secs = secs;
        }

        config.validate().context("Configuration validation failed")?;
        Ok(config)
    }
}

/// Plain `PORT`, as set by most container platforms.
fn port_from_env() -> Option<Result<u16>> {
    let raw = std::env::var("PORT").ok()?;
    Some(
        raw.trim()
            .parse::<u16>()
            .with_context(|| format!("PORT is not a valid port number: {}", raw)),
    )
}
