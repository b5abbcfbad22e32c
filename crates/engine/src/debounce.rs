// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debounced persistence coordinator.
//!
//! Rapid repeated mutations of the same entity (a dispatcher clicking
//! through a column of slots) coalesce into one durable write of the
//! latest state. In-memory state is updated before anything lands here, so
//! a pending write is only ever a flush away from durability, and
//! teardown flushes instead of discarding, so an accepted mutation is
//! never lost.

use ds_core::Clock;
use ds_storage::StoreAdapter;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a write sits pending, absorbing replacements for its key.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Cadence of the background flush loop.
pub const FLUSH_TICK: Duration = Duration::from_millis(50);

struct Pending {
    value: Value,
    due: Instant,
}

/// Per-key debounce of durable writes. Last write wins within the window.
pub struct WriteCoordinator<S: StoreAdapter, C: Clock> {
    store: Arc<S>,
    clock: C,
    window: Duration,
    pending: Mutex<HashMap<String, Pending>>,
}

impl<S: StoreAdapter, C: Clock> WriteCoordinator<S, C> {
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self::with_window(store, clock, DEBOUNCE_WINDOW)
    }

    pub fn with_window(store: Arc<S>, clock: C, window: Duration) -> Self {
        Self { store, clock, window, pending: Mutex::new(HashMap::new()) }
    }

    /// Schedule a durable write. Replaces (and re-arms) any pending write
    /// for the same key.
    pub fn schedule(&self, key: impl Into<String>, value: Value) {
        let due = self.clock.now() + self.window;
        self.pending.lock().insert(key.into(), Pending { value, due });
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Write out every pending entry whose window has elapsed.
    pub fn flush_due(&self) -> usize {
        let now = self.clock.now();
        self.flush_where(|pending| pending.due <= now)
    }

    /// Write out everything pending, due or not. Called on teardown.
    pub fn flush_all(&self) -> usize {
        self.flush_where(|_| true)
    }

    fn flush_where(&self, take: impl Fn(&Pending) -> bool) -> usize {
        let due: Vec<(String, Value)> = {
            let mut pending = self.pending.lock();
            let keys: Vec<String> = pending
                .iter()
                .filter(|(_, p)| take(p))
                .map(|(k, _)| k.clone())
                .collect();
            keys.into_iter()
                .filter_map(|k| pending.remove(&k).map(|p| (k, p.value)))
                .collect()
        };
        let mut written = 0;
        for (key, value) in due {
            match self.store.set(&key, value) {
                Ok(()) => written += 1,
                Err(err) => {
                    // In-memory state already reflects the mutation; warn
                    // and carry on with this session's memory as truth.
                    tracing::warn!(key, error = %err, "durable write failed");
                }
            }
        }
        written
    }
}

impl<S: StoreAdapter, C: Clock> Drop for WriteCoordinator<S, C> {
    fn drop(&mut self) {
        let leftover = self.pending.get_mut();
        if leftover.is_empty() {
            return;
        }
        tracing::debug!(count = leftover.len(), "flushing pending writes on teardown");
        let entries: Vec<(String, Value)> = leftover.drain().map(|(k, p)| (k, p.value)).collect();
        for (key, value) in entries {
            if let Err(err) = self.store.set(&key, value) {
                tracing::warn!(key, error = %err, "teardown flush failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
