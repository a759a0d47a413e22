// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Gateway server bootstrap.
//!
//! Startup order: upstream session first, then the listener. The listener
//! never accepts a connection before the session has been initialized.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use ads_gateway_core::application::{
    CredentialVerifier, ErrorNormalizer, RequestGateway, ShutdownCoordinator, ShutdownOutcome,
    UpstreamSessionManager,
};
use ads_gateway_core::domain::config::GatewayConfig;
use ads_gateway_core::infrastructure::StreamableHttpConnector;
use ads_gateway_core::presentation::{app, AppState};

pub async fn start_gateway(config: GatewayConfig, metrics_port: Option<u16>) -> Result<ShutdownOutcome> {
    let endpoint = config
        .validate()
        .context("Configuration validation failed")?;

    if let Some(port) = metrics_port {
        install_metrics_exporter(&config.host, port)?;
    }

    let connector =
        StreamableHttpConnector::new(endpoint).with_connect_timeout(config.connect_timeout());

    let sessions = Arc::new(UpstreamSessionManager::new(Arc::new(connector)));
    sessions
        .initialize()
        .await
        .context("Failed to establish upstream session")?;

    let credential = config.credential();
    let normalizer = ErrorNormalizer::new(credential.as_ref());
    let verifier = Arc::new(CredentialVerifier::new(credential));

    let state = AppState {
        gateway: Arc::new(RequestGateway::new(sessions.clone(), normalizer)),
        sessions: sessions.clone(),
        verifier,
    };
    let router = app(state, &config.allowed_origins);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Gateway listening on {}", addr);

    let coordinator = Arc::new(ShutdownCoordinator::new(config.shutdown_timeout()));
    let watcher = coordinator.clone();
    tokio::spawn(async move {
        if let Err(e) = watcher.watch_signals().await {
            error!(error = %e, "Failed to install signal handlers");
        }
    });

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(coordinator.shutdown_signal())
        .into_future();

    let outcome = coordinator
        .run(server, &sessions)
        .await
        .context("HTTP server failed")?;

    info!(?outcome, "Gateway stopped");
    Ok(outcome)
}

fn install_metrics_exporter(host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid metrics listen address {}:{}", host, port))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics available on {}", addr);
    Ok(())
}
