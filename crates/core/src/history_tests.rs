// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::slot::SlotStatus;

#[test]
fn entries_get_unique_ids() {
    let a = HistoryEntry::new(HistoryAction::Called, HistoryDetails::default(), "admin", 1);
    let b = HistoryEntry::new(HistoryAction::Called, HistoryDetails::default(), "admin", 1);
    assert_ne!(a.id, b.id);
}

#[test]
fn action_serde_uses_snake_case() {
    let json = serde_json::to_string(&HistoryAction::CageAssigned).unwrap();
    assert_eq!(json, "\"cage_assigned\"");

    let parsed: HistoryAction = serde_json::from_str("\"check_toggled\"").unwrap();
    assert_eq!(parsed, HistoryAction::CheckToggled);
}

#[test]
fn empty_details_serialize_compact() {
    let entry = HistoryEntry::new(HistoryAction::Reset, HistoryDetails::default(), "system", 42);
    let value = serde_json::to_value(&entry).unwrap();
    let details = value.get("details").unwrap();
    assert_eq!(details.as_object().map(|o| o.len()), Some(0));
}

#[test]
fn details_round_trip() {
    let entry = HistoryEntry::new(
        HistoryAction::Finished,
        HistoryDetails {
            from_status: Some(SlotStatus::Loading),
            to_status: Some(SlotStatus::Finished),
            duration_s: Some(90),
            ..HistoryDetails::default()
        },
        "admin",
        1_000,
    );
    let json = serde_json::to_string(&entry).unwrap();
    let parsed: HistoryEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, entry);
}
