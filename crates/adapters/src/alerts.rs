// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert-clearing collaborator.
//!
//! Calling a driver to a slot must clear any stale alerts the views raised
//! for that slot. How alerts are rendered is out of scope; the core only
//! needs somewhere to send the clear.

use ds_core::SlotId;

/// Sink for slot alert lifecycle events.
pub trait AlertSink: Send + Sync + 'static {
    /// Clear all alerts associated with a slot.
    fn clear_alerts(&self, slot: &SlotId);
}

/// Default sink: records the clear in the log and nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn clear_alerts(&self, slot: &SlotId) {
        tracing::debug!(slot = %slot, "clearing slot alerts");
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::AlertSink;
    use ds_core::SlotId;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake alert sink recording every cleared slot.
    #[derive(Clone, Default)]
    pub struct FakeAlertSink {
        cleared: Arc<Mutex<Vec<SlotId>>>,
    }

    impl FakeAlertSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cleared(&self) -> Vec<SlotId> {
            self.cleared.lock().clone()
        }
    }

    impl AlertSink for FakeAlertSink {
        fn clear_alerts(&self, slot: &SlotId) {
            self.cleared.lock().push(slot.clone());
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAlertSink;
