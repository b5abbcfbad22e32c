// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types carried on the synchronization bus.
//!
//! One consolidated event enum replaces the overlapping ad hoc event names
//! the dashboard grew over time. Payloads are notifications, not records:
//! subscribers re-fetch authoritative state instead of trusting the payload.

use crate::cage::CageCode;
use crate::driver::DriverStatus;
use crate::history::HistoryAction;
use crate::slot::SlotId;
use serde::{Deserialize, Serialize};

/// Named topics a subscriber can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    SlotUpdated,
    DriverStatus,
    DriverDelayed,
    AlertsCleared,
    Refresh,
}

/// Events published after state-machine mutations.
///
/// Serializes with `{"type": "entity:action", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "slot:updated")]
    SlotUpdated {
        id: SlotId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cage: Option<CageCode>,
        action: HistoryAction,
        at_ms: u64,
    },

    #[serde(rename = "driver:status")]
    DriverStatusChanged {
        cage: CageCode,
        status: DriverStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<SlotId>,
        at_ms: u64,
    },

    #[serde(rename = "driver:delayed")]
    DriverDelayed {
        cage: CageCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<SlotId>,
        at_ms: u64,
    },

    #[serde(rename = "alerts:cleared")]
    AlertsCleared { slot: SlotId, at_ms: u64 },

    /// Full re-read request: subscribers should drop caches and reload.
    #[serde(rename = "system:refresh")]
    Refresh { at_ms: u64 },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SlotUpdated { .. } => "slot:updated",
            Event::DriverStatusChanged { .. } => "driver:status",
            Event::DriverDelayed { .. } => "driver:delayed",
            Event::AlertsCleared { .. } => "alerts:cleared",
            Event::Refresh { .. } => "system:refresh",
            Event::Custom => "custom",
        }
    }

    pub fn topic(&self) -> Option<Topic> {
        match self {
            Event::SlotUpdated { .. } => Some(Topic::SlotUpdated),
            Event::DriverStatusChanged { .. } => Some(Topic::DriverStatus),
            Event::DriverDelayed { .. } => Some(Topic::DriverDelayed),
            Event::AlertsCleared { .. } => Some(Topic::AlertsCleared),
            Event::Refresh { .. } => Some(Topic::Refresh),
            Event::Custom => None,
        }
    }

    /// Key for duplicate suppression: semantic type + slot + cage.
    ///
    /// `None` means the event is never deduplicated (refresh requests must
    /// always go through).
    pub fn dedup_key(&self) -> Option<String> {
        match self {
            Event::SlotUpdated { id, cage, action, .. } => Some(format!(
                "{}|{}|{}|{}",
                self.name(),
                id,
                cage.as_ref().map(CageCode::as_str).unwrap_or(""),
                action,
            )),
            Event::DriverStatusChanged { cage, status, slot, .. } => Some(format!(
                "{}|{}|{}|{}",
                self.name(),
                slot.as_ref().map(SlotId::as_str).unwrap_or(""),
                cage,
                status,
            )),
            Event::DriverDelayed { cage, slot, .. } => Some(format!(
                "{}|{}|{}",
                self.name(),
                slot.as_ref().map(SlotId::as_str).unwrap_or(""),
                cage,
            )),
            Event::AlertsCleared { slot, .. } => Some(format!("{}|{}", self.name(), slot)),
            Event::Refresh { .. } | Event::Custom => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
