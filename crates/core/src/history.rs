// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot audit history.
//!
//! Every slot transition appends exactly one entry, written in the same
//! mutation as the slot fields themselves so the two can never diverge.
//! The sequence is append-only: never truncated, reordered, or deleted.

use crate::cage::CageCode;
use crate::slot::SlotStatus;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a history entry.
    pub struct EntryId("ent-");
}

/// What happened in a recorded slot transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    CageAssigned,
    Called,
    Loading,
    Finished,
    Reset,
    CheckToggled,
}

crate::simple_display! {
    HistoryAction {
        CageAssigned => "cage_assigned",
        Called => "called",
        Loading => "loading",
        Finished => "finished",
        Reset => "reset",
        CheckToggled => "check_toggled",
    }
}

/// Transition-specific payload for a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<SlotStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<SlotStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cage: Option<CageCode>,
    /// Elapsed seconds carried by timing transitions (loading, finished).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<u64>,
    /// New value of the manual check flag (check_toggled only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

/// One immutable audit record of a slot transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub at_ms: u64,
    pub action: HistoryAction,
    #[serde(default)]
    pub details: HistoryDetails,
    pub actor: String,
}

impl HistoryEntry {
    pub fn new(action: HistoryAction, details: HistoryDetails, actor: &str, at_ms: u64) -> Self {
        Self { id: EntryId::new(), at_ms, action, details, actor: actor.to_string() }
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
