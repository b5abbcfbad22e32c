// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed-driver monitor.
//!
//! A soft, poll-based heuristic: drivers still `entering_hub` five minutes
//! after being called are flagged delayed on the next sweep. There is no
//! hard per-driver timeout to cancel; the periodic task itself is what
//! gets cancelled on teardown.

use crate::hub::Hub;
use ds_core::Clock;
use ds_storage::StoreAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Seconds since `called_at` after which a driver counts as delayed.
pub const DELAYED_AFTER_S: u64 = 5 * 60;

/// Cadence of the delay sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic sweep flagging overdue drivers as delayed.
pub struct DelayMonitor<S: StoreAdapter, C: Clock> {
    hub: Arc<Hub<S, C>>,
    interval: Duration,
}

impl<S: StoreAdapter, C: Clock> DelayMonitor<S, C> {
    pub fn new(hub: Arc<Hub<S, C>>) -> Self {
        Self { hub, interval: SWEEP_INTERVAL }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let flagged = self.hub.sweep_delayed();
                    if !flagged.is_empty() {
                        tracing::info!(count = flagged.len(), "flagged overdue drivers as delayed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
