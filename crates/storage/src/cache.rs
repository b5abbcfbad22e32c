// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through cache over a store adapter.
//!
//! Reads within the TTL are served from memory; every write refreshes the
//! cached value (write-through) so the cache can never serve state older
//! than what this process last wrote. Constructed once and injected: the
//! cache has an owner and a lifecycle, not a module-global.

use crate::store::{StoreAdapter, StoreError};
use ds_core::Clock;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a cached read stays fresh.
pub const READ_CACHE_TTL: Duration = Duration::from_secs(2);

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// TTL read cache decorating an inner [`StoreAdapter`].
pub struct CachedStore<S, C> {
    inner: S,
    clock: C,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<S: StoreAdapter, C: Clock> CachedStore<S, C> {
    pub fn new(inner: S, clock: C) -> Self {
        Self::with_ttl(inner, clock, READ_CACHE_TTL)
    }

    pub fn with_ttl(inner: S, clock: C, ttl: Duration) -> Self {
        Self { inner, clock, ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Insert a value into the cache without touching the durable store.
    ///
    /// The debounced write path uses this so memory and cache reflect a
    /// mutation immediately while the durable write is still pending.
    pub fn prime(&self, key: &str, value: Value) {
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry { value, stored_at: self.clock.now() });
    }

    /// Drop one cached entry, forcing the next read through to the store.
    pub fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }
}

impl<S: StoreAdapter, C: Clock> StoreAdapter for CachedStore<S, C> {
    fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(key) {
                if now.duration_since(entry.stored_at) < self.ttl {
                    return Some(entry.value.clone());
                }
            }
        }
        let value = self.inner.get(key);
        let mut entries = self.entries.lock();
        match &value {
            Some(v) => {
                entries.insert(key.to_string(), CacheEntry { value: v.clone(), stored_at: now });
            }
            None => {
                entries.remove(key);
            }
        }
        value
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        // Cache first: even if the durable write fails, in-memory state is
        // the source of truth for the rest of this session.
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry { value: value.clone(), stored_at: self.clock.now() },
        );
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) {
        self.invalidate(key);
        self.inner.remove(key);
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
