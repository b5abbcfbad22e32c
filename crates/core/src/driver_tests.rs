// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cage::CageCode;
use crate::slot::SlotId;

fn cage(code: &str) -> CageCode {
    CageCode::parse(code).unwrap()
}

fn slot(id: &str) -> SlotId {
    SlotId::new(id)
}

#[test]
fn new_driver_waits_outside() {
    let driver = Driver::new(cage("A-1"), "Marta");
    assert_eq!(driver.status, DriverStatus::WaitingOutside);
    assert!(driver.assigned_slot.is_none());
    assert!(!driver.checked);
}

#[test]
fn entering_hub_takes_slot_and_stamps_called_at() {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.checked = true;

    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), 10_000);

    assert_eq!(driver.assigned_slot, Some(slot("5")));
    assert_eq!(driver.called_at_ms, Some(10_000));
    assert!(!driver.checked);
}

#[test]
fn arrived_stamps_and_checks() {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), 10_000);
    driver.set_status(DriverStatus::Arrived, None, 20_000);

    assert_eq!(driver.arrived_at_ms, Some(20_000));
    assert!(driver.checked);
    // Slot assignment survives arrival.
    assert_eq!(driver.assigned_slot, Some(slot("5")));
}

#[test]
fn delayed_without_slot_clears_assignment() {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), 10_000);

    driver.set_status(DriverStatus::Delayed, None, 20_000);
    assert!(driver.assigned_slot.is_none());
    assert!(!driver.checked);
}

#[test]
fn delayed_with_slot_keeps_it() {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::Delayed, Some(slot("5")), 20_000);
    assert_eq!(driver.assigned_slot, Some(slot("5")));
}

#[test]
fn delayed_then_waiting_outside_clears_everything() {
    // Delayed on slot 5, then sent back outside.
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), 10_000);
    driver.set_status(DriverStatus::Arrived, None, 15_000);
    driver.set_status(DriverStatus::Delayed, Some(slot("5")), 20_000);

    driver.set_status(DriverStatus::WaitingOutside, None, 30_000);

    assert!(driver.assigned_slot.is_none());
    assert!(driver.called_at_ms.is_none());
    assert!(driver.arrived_at_ms.is_none());
    assert!(!driver.checked);
}

#[test]
fn no_show_is_reversible_without_losing_timestamps() {
    let mut driver = Driver::new(cage("B-3"), "Jonas");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("2")), 10_000);

    driver.set_status(DriverStatus::NoShow, None, 20_000);
    assert_eq!(driver.status, DriverStatus::NoShow);
    assert_eq!(driver.called_at_ms, Some(10_000));

    driver.set_status(DriverStatus::NoShowReversed, None, 25_000);
    assert_eq!(driver.status, DriverStatus::NoShowReversed);
    assert_eq!(driver.assigned_slot, Some(slot("2")));
}

#[test]
fn toggle_checked_preserves_status() {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), 10_000);

    driver.toggle_checked(11_000);
    assert!(driver.checked);
    assert_eq!(driver.status, DriverStatus::EnteringHub);
}

#[test]
fn reset_equals_waiting_outside() {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), 10_000);
    driver.reset(20_000);
    assert_eq!(driver.status, DriverStatus::WaitingOutside);
    assert!(driver.assigned_slot.is_none());
}

#[yare::parameterized(
    just_called   = { 10_000, 10_000, false },
    under         = { 10_000, 299_000, false },
    at_threshold  = { 10_000, 310_000, true },
    well_over     = { 10_000, 1_000_000, true },
)]
fn is_overdue_cases(called_at_ms: u64, now_ms: u64, expected: bool) {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), called_at_ms);
    assert_eq!(driver.is_overdue(300, now_ms), expected);
}

#[test]
fn is_overdue_ignores_non_entering_statuses() {
    let mut driver = Driver::new(cage("A-1"), "Marta");
    driver.set_status(DriverStatus::EnteringHub, Some(slot("5")), 0);
    driver.set_status(DriverStatus::Arrived, None, 1_000);
    assert!(!driver.is_overdue(300, 1_000_000));
}

#[test]
fn legacy_camel_case_fields_still_deserialize() {
    let json = r#"{
        "cageCode": "a-1",
        "name": "Marta",
        "status": "entering_hub",
        "assignedSlot": "5",
        "vehicleType": "van"
    }"#;
    let driver: Driver = serde_json::from_str(json).unwrap();
    assert_eq!(driver.cage_code, "A-1");
    assert_eq!(driver.assigned_slot, Some(slot("5")));
    assert_eq!(driver.vehicle_type.as_deref(), Some("van"));
}
