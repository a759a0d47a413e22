// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Shutdown Coordinator
//!
//! Graceful drain raced against a hard deadline.
//!
//! ```text
//! trigger() ──> token cancelled
//!                 ├─ graceful: listener stops accepting → in-flight responses finish → session.close()
//!                 └─ deadline: sleep(deadline), armed when shutdown begins
//! first to finish decides the outcome; the loser is dropped
//! ```
//!
//! Only the first trigger has an effect, so repeated signals neither
//! re-close the session nor error.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::session_manager::UpstreamSessionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Drain and session close completed before the deadline.
    Graceful,
    /// The deadline fired first; in-flight work is abandoned.
    DeadlineExceeded,
}

impl ShutdownOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Graceful => 0,
            Self::DeadlineExceeded => 1,
        }
    }
}

pub struct ShutdownCoordinator {
    token: CancellationToken,
    started: AtomicBool,
    deadline: Duration,
}

impl ShutdownCoordinator {
    pub fn new(deadline: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            started: AtomicBool::new(false),
            deadline,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn is_shutting_down(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Begin shutdown. Returns `false` when shutdown was already under way.
    pub fn trigger(&self, reason: &str) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!(%reason, "Shutdown already in progress");
            return false;
        }
        info!(%reason, "Shutdown requested");
        self.token.cancel();
        true
    }

    /// Future that resolves once shutdown has been triggered. Suitable for
    /// `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        self.token.clone().cancelled_owned()
    }

    /// Drive `server` to completion, then close the session.
    ///
    /// `server` must itself stop accepting once [`Self::shutdown_signal`]
    /// resolves and return after its in-flight requests finish.
    pub async fn run<S>(
        &self,
        server: S,
        sessions: &UpstreamSessionManager,
    ) -> io::Result<ShutdownOutcome>
    where
        S: Future<Output = io::Result<()>>,
    {
        let graceful = async {
            let served = server.await;
            sessions.close().await;
            served
        };
        tokio::pin!(graceful);

        tokio::select! {
            result = &mut graceful => {
                // Listener ended without a shutdown request.
                warn!("HTTP server exited before shutdown was requested");
                result?;
                return Ok(ShutdownOutcome::Graceful);
            }
            _ = self.token.cancelled() => {}
        }

        info!(
            deadline_secs = self.deadline.as_secs_f64(),
            "Draining in-flight requests"
        );
        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        tokio::select! {
            result = &mut graceful => {
                result?;
                info!("Graceful shutdown complete");
                Ok(ShutdownOutcome::Graceful)
            }
            _ = &mut deadline => {
                error!(
                    deadline_secs = self.deadline.as_secs_f64(),
                    "Shutdown deadline exceeded; abandoning in-flight work"
                );
                Ok(ShutdownOutcome::DeadlineExceeded)
            }
        }
    }

    /// Listen for Ctrl+C and SIGTERM for the life of the process, triggering
    /// shutdown on each. Returns only if a handler cannot be installed.
    pub async fn watch_signals(&self) -> io::Result<()> {
        #[cfg(unix)]
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        loop {
            #[cfg(unix)]
            {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        result?;
                        self.trigger("SIGINT");
                    }
                    _ = terminate.recv() => {
                        self.trigger("SIGTERM");
                    }
                }
            }

            #[cfg(not(unix))]
            {
                tokio::signal::ctrl_c().await?;
                self.trigger("Ctrl+C");
            }
        }
    }
}
