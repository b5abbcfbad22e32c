// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronization bus: one typed pub/sub mechanism for every view.
//!
//! Two delivery paths reach subscribers:
//!
//! 1. In-process channels: synchronous fan-out to every subscriber in
//!    this process, FIFO per subscriber.
//! 2. The update marker key: slot events are also written to a designated
//!    store key; other processes poll it and re-deliver locally. The
//!    marker payload is a notification, not a record: subscribers re-fetch
//!    authoritative state instead of trusting it.
//!
//! Both paths can deliver the same transition, so duplicate suppression is
//! part of the contract: two notifications with the same semantic type,
//! slot, and cage inside [`DEDUP_WINDOW`] count as one.

use ds_core::{Clock, Event, Topic};
use ds_storage::{StoreAdapter, UPDATE_MARKER_KEY};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::watch;

/// Window inside which equal notifications are suppressed as duplicates.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(15);

/// How often the cross-process update marker is polled.
///
/// Kept at the read-cache TTL so a poll never waits on a stale cached
/// marker longer than one cycle.
pub const MARKER_POLL_INTERVAL: Duration = Duration::from_secs(2);

struct Subscriber {
    topics: Option<Vec<Topic>>,
    tx: mpsc::UnboundedSender<Event>,
}

/// Publish/subscribe fan-out over in-process channels plus the store-backed
/// update marker.
pub struct SyncBus<S, C> {
    store: Arc<S>,
    clock: C,
    window: Duration,
    subscribers: Mutex<Vec<Subscriber>>,
    recent: Mutex<HashMap<String, Instant>>,
    /// Timestamp of the newest marker this process wrote or consumed.
    /// Our own writes advance it, so the poll path skips them; the
    /// marker fires on other processes only, never the writer's own.
    last_marker_ms: Mutex<u64>,
}

impl<S: StoreAdapter, C: Clock> SyncBus<S, C> {
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self::with_window(store, clock, DEDUP_WINDOW)
    }

    pub fn with_window(store: Arc<S>, clock: C, window: Duration) -> Self {
        Self {
            store,
            clock,
            window,
            subscribers: Mutex::new(Vec::new()),
            recent: Mutex::new(HashMap::new()),
            last_marker_ms: Mutex::new(0),
        }
    }

    /// Subscribe to every topic.
    pub fn subscribe_all(&self) -> mpsc::UnboundedReceiver<Event> {
        self.add_subscriber(None)
    }

    /// Subscribe to a topic subset.
    pub fn subscribe(&self, topics: &[Topic]) -> mpsc::UnboundedReceiver<Event> {
        self.add_subscriber(Some(topics.to_vec()))
    }

    fn add_subscriber(&self, topics: Option<Vec<Topic>>) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(Subscriber { topics, tx });
        rx
    }

    /// Publish an event to all delivery paths.
    ///
    /// Returns false when the event was suppressed as a duplicate.
    pub fn publish(&self, event: &Event) -> bool {
        if self.is_duplicate(event) {
            tracing::debug!(event = event.name(), "suppressing duplicate notification");
            return false;
        }
        if let Event::SlotUpdated { at_ms, .. } = event {
            self.write_marker(event, *at_ms);
        }
        self.deliver(event);
        true
    }

    /// Poll the update marker for a slot event written by another process.
    ///
    /// Returns the event if one was delivered to subscribers.
    pub fn poll_marker(&self) -> Option<Event> {
        let value = self.store.get(UPDATE_MARKER_KEY)?;
        let event: Event = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "unreadable update marker");
                return None;
            }
        };
        let Event::SlotUpdated { at_ms, .. } = &event else {
            return None;
        };
        {
            let mut last = self.last_marker_ms.lock();
            if *at_ms <= *last {
                return None;
            }
            *last = *at_ms;
        }
        if self.is_duplicate(&event) {
            return None;
        }
        self.deliver(&event);
        Some(event)
    }

    /// Periodic marker poll until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(MARKER_POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_marker();
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    fn is_duplicate(&self, event: &Event) -> bool {
        let Some(key) = event.dedup_key() else {
            return false;
        };
        let now = self.clock.now();
        let mut recent = self.recent.lock();
        recent.retain(|_, seen| now.duration_since(*seen) < self.window);
        if recent.contains_key(&key) {
            return true;
        }
        recent.insert(key, now);
        false
    }

    fn write_marker(&self, event: &Event, at_ms: u64) {
        match serde_json::to_value(event) {
            Ok(value) => {
                if let Err(err) = self.store.set(UPDATE_MARKER_KEY, value) {
                    tracing::warn!(error = %err, "failed to write update marker");
                }
                *self.last_marker_ms.lock() = at_ms;
            }
            Err(err) => {
                tracing::warn!(error = %err, "unserializable event for update marker");
            }
        }
    }

    fn deliver(&self, event: &Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sub| {
            let wants = match (&sub.topics, event.topic()) {
                (None, _) => true,
                (Some(topics), Some(topic)) => topics.contains(&topic),
                (Some(_), None) => false,
            };
            if !wants {
                return true;
            }
            // A closed receiver means the view unmounted; drop it.
            sub.tx.send(event.clone()).is_ok()
        });
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
