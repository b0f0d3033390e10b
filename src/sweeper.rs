// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expiry Sweeper
//!
//! Background task that deletes expired nonces and sessions. Lookups
//! already reject and drop expired records; the sweep only reclaims rows
//! nobody comes back for.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{NonceStore, SessionManager};

/// Periodically purges expired nonces and sessions.
pub struct ExpirySweeper {
    nonces: NonceStore,
    sessions: SessionManager,
    interval: Duration,
}

/// Rows removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub nonces: usize,
    pub sessions: usize,
}

impl ExpirySweeper {
    pub fn new(nonces: NonceStore, sessions: SessionManager, interval: Duration) -> Self {
        Self {
            nonces,
            sessions,
            interval,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Expiry sweeper shutting down");
                return;
            }

            self.sweep();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep. Failures are logged and retried next interval.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.nonces.purge_expired() {
            Ok(count) => report.nonces = count,
            Err(e) => warn!(error = %e, "Expiry sweeper: failed to purge nonces"),
        }
        match self.sessions.purge_expired() {
            Ok(count) => report.sessions = count,
            Err(e) => warn!(error = %e, "Expiry sweeper: failed to purge sessions"),
        }

        if report != SweepReport::default() {
            debug!(
                nonces = report.nonces,
                sessions = report.sessions,
                "Expiry sweeper: purged expired records"
            );
        }
        report
    }
}
