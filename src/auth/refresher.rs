// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Background refresh of the verification keys.
//!
//! Refetches the key set on a fixed interval shorter than the cache TTL, so
//! request paths find unexpired keys and rarely wait on a fetch. A failed
//! refresh leaves the cached keys in place until they expire.
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::jwks::KeySetCache;

/// Default interval: ten minutes ahead of the default cache TTL.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(50 * 60);

pub struct KeySetRefresher {
    keys: KeySetCache,
    interval: Duration,
}

impl KeySetRefresher {
    pub fn new(keys: KeySetCache) -> Self {
        Self {
            keys,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "JWKS refresher starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("JWKS refresher shutting down");
                    return;
                }
            }

            self.refresh_step().await;
        }
    }

    async fn refresh_step(&self) {
        match self.keys.refresh().await {
            Ok(keys) => debug!(key_count = keys.len(), "JWKS background refresh complete"),
            Err(e) => warn!(error = %e, "JWKS background refresh failed, keeping cached keys"),
        }
    }
}
