// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote mirror adapter: best-effort replication of slot records.
//!
//! The mirror is additive and side-channel only. Upserts are keyed by slot
//! id; the change feed delivers full-row snapshots on insert/update. Every
//! error here, including "no remote configured", degrades the hub to
//! local-only operation and must never fail the local transition.

use async_trait::async_trait;
use ds_core::Slot;
use serde_json::Value;
use thiserror::Error;

/// Errors from mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("no remote mirror configured")]
    NotConfigured,
    #[error("remote rejected the write: {0}")]
    Backend(String),
}

/// Kind of change reported by the remote feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteChangeKind {
    Insert,
    Update,
}

/// One change from the remote feed: a full-row snapshot, not a delta.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    pub kind: RemoteChangeKind,
    pub row: Value,
}

/// Adapter for the remote relational store.
#[async_trait]
pub trait MirrorAdapter: Send + Sync + 'static {
    /// Upsert one slot record, keyed by slot id.
    async fn upsert_slot(&self, slot: &Slot) -> Result<(), MirrorError>;

    /// Next change from the realtime feed. `None` means the feed is closed
    /// (or was never open) and the caller should stop pulling.
    async fn next_change(&self) -> Option<RemoteChange>;
}

/// The not-configured mirror: rejects writes, has no feed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMirror;

#[async_trait]
impl MirrorAdapter for NullMirror {
    async fn upsert_slot(&self, _slot: &Slot) -> Result<(), MirrorError> {
        Err(MirrorError::NotConfigured)
    }

    async fn next_change(&self) -> Option<RemoteChange> {
        None
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{MirrorAdapter, MirrorError, RemoteChange};
    use async_trait::async_trait;
    use ds_core::Slot;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Fake mirror recording upserts and replaying injected remote changes.
    pub struct FakeMirror {
        upserts: Arc<Mutex<Vec<Slot>>>,
        fail_writes: Arc<Mutex<bool>>,
        changes_tx: mpsc::UnboundedSender<RemoteChange>,
        changes_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RemoteChange>>,
    }

    impl Default for FakeMirror {
        fn default() -> Self {
            let (changes_tx, changes_rx) = mpsc::unbounded_channel();
            Self {
                upserts: Arc::new(Mutex::new(Vec::new())),
                fail_writes: Arc::new(Mutex::new(false)),
                changes_tx,
                changes_rx: tokio::sync::Mutex::new(changes_rx),
            }
        }
    }

    impl FakeMirror {
        pub fn new() -> Self {
            Self::default()
        }

        /// All slots upserted so far.
        pub fn upserts(&self) -> Vec<Slot> {
            self.upserts.lock().clone()
        }

        /// Make subsequent upserts fail, to exercise degraded sync.
        pub fn fail_writes(&self, fail: bool) {
            *self.fail_writes.lock() = fail;
        }

        /// Inject a change as if the remote feed delivered it.
        pub fn push_change(&self, change: RemoteChange) {
            let _ = self.changes_tx.send(change);
        }
    }

    #[async_trait]
    impl MirrorAdapter for FakeMirror {
        async fn upsert_slot(&self, slot: &Slot) -> Result<(), MirrorError> {
            if *self.fail_writes.lock() {
                return Err(MirrorError::Backend("injected failure".to_string()));
            }
            self.upserts.lock().push(slot.clone());
            Ok(())
        }

        async fn next_change(&self) -> Option<RemoteChange> {
            self.changes_rx.lock().await.recv().await
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeMirror;

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
