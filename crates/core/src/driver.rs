// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver record and hub-entry lifecycle.
//!
//! A driver is referenced from slots by cage code only, a soft string
//! reference, not an owned key. Either side may exist without the other.

use crate::cage::CageCode;
use crate::slot::SlotId;
use serde::{Deserialize, Serialize};

/// Hub-entry lifecycle of a driver.
///
/// `no_show` and `no_show_reversed` were once an out-of-band marker layered
/// on top of the normal status; they are first-class variants here and the
/// legacy marker is folded in at the storage boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    #[default]
    WaitingOutside,
    EnteringHub,
    Arrived,
    Delayed,
    NoShow,
    NoShowReversed,
}

crate::simple_display! {
    DriverStatus {
        WaitingOutside => "waiting_outside",
        EnteringHub => "entering_hub",
        Arrived => "arrived",
        Delayed => "delayed",
        NoShow => "no_show",
        NoShowReversed => "no_show_reversed",
    }
}

/// A person associated with a cage code, tracked through hub entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(alias = "cageCode")]
    pub cage_code: CageCode,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: DriverStatus,
    #[serde(default, alias = "assignedSlot", skip_serializing_if = "Option::is_none")]
    pub assigned_slot: Option<SlotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_at_ms: Option<u64>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, alias = "vehicleType", skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub last_update_ms: u64,
}

impl Driver {
    /// Fresh driver waiting outside the hub.
    pub fn new(cage_code: CageCode, name: impl Into<String>) -> Self {
        Self {
            cage_code,
            name: name.into(),
            status: DriverStatus::WaitingOutside,
            assigned_slot: None,
            arrived_at_ms: None,
            called_at_ms: None,
            checked: false,
            vehicle_type: None,
            last_update_ms: 0,
        }
    }

    /// Transition to `status`, applying the status-specific side effects.
    ///
    /// - `entering_hub`: takes the supplied slot, stamps `called_at`,
    ///   clears the check flag.
    /// - `arrived`: stamps `arrived_at` and sets the check flag.
    /// - `delayed`: keeps the slot only when one is supplied; clears the
    ///   check flag.
    /// - `waiting_outside`: clears slot, timestamps, and check flag.
    /// - `no_show` / `no_show_reversed`: status only; timestamps untouched
    ///   so the marker stays reversible.
    pub fn set_status(&mut self, status: DriverStatus, slot: Option<SlotId>, now_ms: u64) {
        match status {
            DriverStatus::EnteringHub => {
                if slot.is_some() {
                    self.assigned_slot = slot;
                }
                self.called_at_ms = Some(now_ms);
                self.checked = false;
            }
            DriverStatus::Arrived => {
                self.arrived_at_ms = Some(now_ms);
                self.checked = true;
            }
            DriverStatus::Delayed => {
                self.assigned_slot = slot;
                self.checked = false;
            }
            DriverStatus::WaitingOutside => {
                self.assigned_slot = None;
                self.called_at_ms = None;
                self.arrived_at_ms = None;
                self.checked = false;
            }
            DriverStatus::NoShow | DriverStatus::NoShowReversed => {}
        }
        self.status = status;
        self.last_update_ms = now_ms;
    }

    /// Flip the manual check flag without touching the status.
    pub fn toggle_checked(&mut self, now_ms: u64) {
        self.checked = !self.checked;
        self.last_update_ms = now_ms;
    }

    /// Back to `waiting_outside`, clearing assignment and timestamps.
    pub fn reset(&mut self, now_ms: u64) {
        self.set_status(DriverStatus::WaitingOutside, None, now_ms);
    }

    /// Soft delay heuristic: called into the hub more than `threshold_s`
    /// seconds ago with no arrival since.
    pub fn is_overdue(&self, threshold_s: u64, now_ms: u64) -> bool {
        if self.status != DriverStatus::EnteringHub {
            return false;
        }
        match self.called_at_ms {
            Some(called_at) => crate::slot::elapsed_secs(called_at, now_ms) >= threshold_s,
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
