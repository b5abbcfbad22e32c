// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote mirror pump and sync-status indicator.
//!
//! The pump drains the hub's mirror op queue into the remote adapter and
//! feeds remote changes back into the hub. Mirror failures never touch the
//! local operation that produced them; they only flip the sync-status
//! indicator the views can render.

use crate::hub::Hub;
use ds_adapters::MirrorAdapter;
use ds_core::{Clock, Slot};
use ds_storage::StoreAdapter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Replication work enqueued by hub operations.
#[derive(Debug, Clone)]
pub enum MirrorOp {
    UpsertSlot(Slot),
}

#[derive(Default)]
struct SyncStatusInner {
    degraded: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// Non-fatal health indicator for remote replication.
#[derive(Clone, Default)]
pub struct SyncStatus {
    inner: Arc<SyncStatusInner>,
}

impl SyncStatus {
    /// True while replication is keeping up (or no mirror is attached).
    pub fn ok(&self) -> bool {
        !self.inner.degraded.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    pub(crate) fn record_success(&self) {
        self.inner.degraded.store(false, Ordering::Relaxed);
        *self.inner.last_error.lock() = None;
    }

    pub(crate) fn record_failure(&self, error: &str) {
        self.inner.degraded.store(true, Ordering::Relaxed);
        *self.inner.last_error.lock() = Some(error.to_string());
    }
}

/// Drains mirror ops and applies remote changes until shutdown.
pub struct MirrorPump<S: StoreAdapter, C: Clock> {
    hub: Arc<Hub<S, C>>,
    mirror: Arc<dyn MirrorAdapter>,
    ops: mpsc::UnboundedReceiver<MirrorOp>,
    status: SyncStatus,
}

impl<S: StoreAdapter, C: Clock> MirrorPump<S, C> {
    /// Attach a mirror to the hub. Returns `None` if a pump already took
    /// the op queue.
    pub fn attach(hub: Arc<Hub<S, C>>, mirror: Arc<dyn MirrorAdapter>) -> Option<Self> {
        let ops = hub.take_mirror_ops()?;
        let status = hub.sync_status();
        Some(Self { hub, mirror, ops, status })
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut feed_open = true;
        loop {
            tokio::select! {
                op = self.ops.recv() => match op {
                    Some(MirrorOp::UpsertSlot(slot)) => self.upsert(&slot).await,
                    None => break,
                },
                change = self.mirror.next_change(), if feed_open => match change {
                    Some(change) => {
                        if self.hub.apply_remote_slot(change.row).is_none() {
                            tracing::warn!("remote change without a usable slot id, ignoring");
                        }
                    }
                    None => {
                        // Feed closed (or never opened); keep draining ops.
                        feed_open = false;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn upsert(&self, slot: &Slot) {
        match self.mirror.upsert_slot(slot).await {
            Ok(()) => self.status.record_success(),
            Err(err) => {
                // Local state already moved on; replication degrades quietly.
                tracing::warn!(slot = %slot.id, error = %err, "mirror upsert failed, local-only");
                self.status.record_failure(&err.to_string());
            }
        }
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
