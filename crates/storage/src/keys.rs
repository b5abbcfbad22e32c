// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespaced storage keys.
//!
//! The key scheme is a compatibility contract with the views that read the
//! store directly; renaming a key orphans every record written under it.

use ds_core::{CageCode, SlotId};

/// Canonical driver set: keyed map of cage code to driver record.
pub const DRIVER_SET_KEY: &str = "driver_data_obj";

/// Legacy driver list: flat array of driver records. Read-only compat;
/// the canonical write path never produces it.
pub const LEGACY_DRIVER_LIST_KEY: &str = "driver_data";

/// Cross-process update marker; holds the last published slot event.
pub const UPDATE_MARKER_KEY: &str = "last_slot_update";

/// Per-slot record key: `slot_<id>_data`.
pub fn slot_data_key(id: &SlotId) -> String {
    format!("slot_{id}_data")
}

/// Legacy per-cage no-show marker key: `no_show_<cage>`.
///
/// Still read (and cleared on system reset) so data written by older views
/// folds into the first-class no-show status.
pub fn no_show_marker_key(cage: &CageCode) -> String {
    format!("no_show_{cage}")
}
