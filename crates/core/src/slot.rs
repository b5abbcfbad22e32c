// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading slot identifier and state machine.

use crate::cage::CageCode;
use crate::history::{HistoryAction, HistoryDetails, HistoryEntry};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Stable identifier of a physical loading position ("1".."30").
///
/// Slots exist as a fixed small set; reading an unknown id yields a fresh
/// default record rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub SmolStr);

impl SlotId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SlotId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SlotId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for SlotId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SlotId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lifecycle status of a slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    #[default]
    Waiting,
    Called,
    Loading,
    Finished,
}

crate::simple_display! {
    SlotStatus {
        Waiting => "waiting",
        Called => "called",
        Loading => "loading",
        Finished => "finished",
    }
}

/// Errors from slot transitions.
///
/// `finish` is the one genuinely validated transition; everything else is
/// tolerant by business rule (overwriting a cage, resetting from any state).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("invalid transition: slot is {from}, cannot move to {to}")]
    InvalidTransition { from: SlotStatus, to: SlotStatus },
}

/// Elapsed whole seconds between two epoch-millisecond stamps.
///
/// Floored, and clamped to 0 when clock skew would make it negative.
pub fn elapsed_secs(start_ms: u64, end_ms: u64) -> u64 {
    end_ms.saturating_sub(start_ms) / 1000
}

/// A physical loading position with its own lifecycle and timers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slot {
    pub id: SlotId,
    #[serde(alias = "cageCode", skip_serializing_if = "Option::is_none")]
    pub cage_code: Option<CageCode>,
    pub status: SlotStatus,
    /// Manual check flag, independent of the status lifecycle.
    pub checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading_started_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Seconds from called to loading; present after the loading transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_duration_s: Option<u64>,
    /// Seconds from loading to finished; present after the finished transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading_duration_s: Option<u64>,
    /// Seconds from called to finished; present after the finished transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_s: Option<u64>,
    /// Append-only audit log; never truncated, reordered, or deleted.
    pub history: Vec<HistoryEntry>,
    pub last_update_ms: u64,
    /// Finished cycles today; bumped only by the finished transition.
    pub daily_throughput: u32,
}

impl Slot {
    /// Fresh slot in the waiting state with no cage and no history.
    pub fn new(id: SlotId) -> Self {
        Self { id, ..Self::default() }
    }

    /// Assign a cage to this slot, valid from any state.
    ///
    /// Overwriting a different cage is allowed; drivers get reshuffled
    /// between positions all the time. Forces the slot back to `waiting`
    /// and clears the timing fields for the new cycle.
    pub fn assign_cage(&mut self, cage: CageCode, actor: &str, now_ms: u64) {
        let from = self.status;
        self.cage_code = Some(cage.clone());
        self.status = SlotStatus::Waiting;
        self.clear_timing();
        self.push_entry(
            HistoryAction::CageAssigned,
            HistoryDetails {
                from_status: Some(from),
                to_status: Some(SlotStatus::Waiting),
                cage: Some(cage),
                ..HistoryDetails::default()
            },
            actor,
            now_ms,
        );
    }

    /// Upsert-call: make sure this slot is `called` for the given cage.
    ///
    /// If the slot is already called for that cage this is a no-op. If the
    /// cage differs (or none is assigned), the cage is assigned first, an
    /// explicit, named version of the tolerant auto-assignment the dashboard
    /// relies on. Returns whether a transition happened.
    pub fn ensure_called(&mut self, cage: &CageCode, actor: &str, now_ms: u64) -> bool {
        if self.status == SlotStatus::Called && self.cage_code.as_ref() == Some(cage) {
            return false;
        }
        if self.cage_code.as_ref() != Some(cage) {
            self.assign_cage(cage.clone(), actor, now_ms);
        }
        let from = self.status;
        self.status = SlotStatus::Called;
        self.called_at_ms = Some(now_ms);
        self.loading_started_at_ms = None;
        self.finished_at_ms = None;
        self.called_duration_s = None;
        self.loading_duration_s = None;
        self.total_duration_s = None;
        self.push_entry(
            HistoryAction::Called,
            HistoryDetails {
                from_status: Some(from),
                to_status: Some(SlotStatus::Called),
                cage: Some(cage.clone()),
                ..HistoryDetails::default()
            },
            actor,
            now_ms,
        );
        true
    }

    /// Begin loading. Strict: the slot must already be `called`.
    ///
    /// Callers that want the historical tolerant behavior compose
    /// [`Slot::ensure_called`] with this, which keeps auto-promotion
    /// distinguishable from caller bugs in tests.
    pub fn start_loading(&mut self, actor: &str, now_ms: u64) -> Result<(), SlotError> {
        if self.status != SlotStatus::Called {
            return Err(SlotError::InvalidTransition {
                from: self.status,
                to: SlotStatus::Loading,
            });
        }
        self.status = SlotStatus::Loading;
        self.loading_started_at_ms = Some(now_ms);
        let called_duration = self.called_at_ms.map(|start| elapsed_secs(start, now_ms));
        self.called_duration_s = called_duration;
        self.push_entry(
            HistoryAction::Loading,
            HistoryDetails {
                from_status: Some(SlotStatus::Called),
                to_status: Some(SlotStatus::Loading),
                cage: self.cage_code.clone(),
                duration_s: called_duration,
                ..HistoryDetails::default()
            },
            actor,
            now_ms,
        );
        Ok(())
    }

    /// Finish the cycle. Valid only from `loading`.
    pub fn finish(&mut self, actor: &str, now_ms: u64) -> Result<(), SlotError> {
        if self.status != SlotStatus::Loading {
            return Err(SlotError::InvalidTransition {
                from: self.status,
                to: SlotStatus::Finished,
            });
        }
        self.status = SlotStatus::Finished;
        self.finished_at_ms = Some(now_ms);
        self.loading_duration_s =
            self.loading_started_at_ms.map(|start| elapsed_secs(start, now_ms));
        let total = self.called_at_ms.map(|start| elapsed_secs(start, now_ms));
        self.total_duration_s = total;
        self.daily_throughput += 1;
        self.push_entry(
            HistoryAction::Finished,
            HistoryDetails {
                from_status: Some(SlotStatus::Loading),
                to_status: Some(SlotStatus::Finished),
                cage: self.cage_code.clone(),
                duration_s: total,
                ..HistoryDetails::default()
            },
            actor,
            now_ms,
        );
        Ok(())
    }

    /// Reset to `waiting` from any state, clearing cage and timing.
    ///
    /// Idempotent in outcome; each call still appends its own history entry.
    pub fn reset(&mut self, actor: &str, now_ms: u64) {
        let from = self.status;
        self.cage_code = None;
        self.status = SlotStatus::Waiting;
        self.clear_timing();
        self.push_entry(
            HistoryAction::Reset,
            HistoryDetails {
                from_status: Some(from),
                to_status: Some(SlotStatus::Waiting),
                ..HistoryDetails::default()
            },
            actor,
            now_ms,
        );
    }

    /// Flip the manual check flag, independent of status.
    pub fn toggle_checked(&mut self, actor: &str, now_ms: u64) {
        self.checked = !self.checked;
        self.push_entry(
            HistoryAction::CheckToggled,
            HistoryDetails { checked: Some(self.checked), ..HistoryDetails::default() },
            actor,
            now_ms,
        );
    }

    fn clear_timing(&mut self) {
        self.called_at_ms = None;
        self.loading_started_at_ms = None;
        self.finished_at_ms = None;
        self.called_duration_s = None;
        self.loading_duration_s = None;
        self.total_duration_s = None;
    }

    fn push_entry(
        &mut self,
        action: HistoryAction,
        details: HistoryDetails,
        actor: &str,
        now_ms: u64,
    ) {
        self.history.push(HistoryEntry::new(action, details, actor, now_ms));
        self.last_update_ms = now_ms;
    }

    /// Most recent history entry, if any transition has been recorded.
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }
}

crate::builder! {
    pub struct SlotBuilder => Slot {
        into {
            id: SlotId = "1",
        }
        set {
            status: SlotStatus = SlotStatus::Waiting,
            checked: bool = false,
            history: Vec<HistoryEntry> = Vec::new(),
            last_update_ms: u64 = 0,
            daily_throughput: u32 = 0,
        }
        option {
            cage_code: CageCode = None,
            called_at_ms: u64 = None,
            loading_started_at_ms: u64 = None,
            finished_at_ms: u64 = None,
            called_duration_s: u64 = None,
            loading_duration_s: u64 = None,
            total_duration_s: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
