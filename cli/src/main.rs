// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # ads-gateway
//!
//! REST front door for a single upstream MCP tool session.
//!
//! - Loads `.env`, then the optional YAML config, then flags / environment
//! - Connects the upstream session before accepting any request
//! - Exits 0 after a graceful drain, 1 when the shutdown deadline fires

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use ads_gateway::server;
use ads_gateway::settings::GatewayArgs;
use ads_gateway_core::application::ShutdownOutcome;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Authenticated REST gateway over an upstream MCP tool service
#[derive(Parser)]
#[command(name = "ads-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, env = "GATEWAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "GATEWAY_METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;

    let config = cli.gateway.resolve()?;
    info!(?config, "Configuration loaded");

    let outcome = server::start_gateway(config, cli.metrics_port).await?;
    if outcome == ShutdownOutcome::DeadlineExceeded {
        std::process::exit(outcome.exit_code());
    }
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .init(),
    }

    Ok(())
}
