// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::debounce::DEBOUNCE_WINDOW;
use crate::monitor::DELAYED_AFTER_S;
use ds_adapters::{FakeAlertSink, FakeNotifyAdapter};
use ds_core::{
    DriverStatus, Event, FakeClock, HistoryAction, Slot, SlotError, SlotId, SlotStatus, Topic,
};
use ds_storage::{MemoryStore, StoreAdapter, DRIVER_SET_KEY, LEGACY_DRIVER_LIST_KEY};
use serde_json::json;
use std::sync::Arc;

fn hub() -> (Hub<MemoryStore, FakeClock>, MemoryStore, FakeClock) {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let hub = Hub::new(store.clone(), clock.clone());
    (hub, store, clock)
}

fn slot(id: &str) -> SlotId {
    SlotId::new(id)
}

#[test]
fn unknown_slot_reads_as_fresh_default() {
    let (hub, _store, _clock) = hub();
    let s = hub.get_slot(&slot("17"));
    assert_eq!(s.status, SlotStatus::Waiting);
    assert!(s.cage_code.is_none());
    assert!(s.history.is_empty());
}

#[test]
fn assign_then_call_scenario() {
    let (hub, _store, _clock) = hub();
    let alerts = FakeAlertSink::new();
    let hub = hub.alerts(Arc::new(alerts.clone()));

    hub.assign_cage(&slot("5"), "A-1", "driverA1").unwrap();
    let s = hub.call_slot(&slot("5"), "A-1").unwrap();

    assert_eq!(s.status, SlotStatus::Called);
    assert_eq!(s.cage_code.as_ref().map(|c| c.as_str()), Some("A-1"));
    assert!(s.called_at_ms.is_some());
    assert_eq!(s.history.len(), 2);
    // Calling a slot clears its stale alerts.
    assert_eq!(alerts.cleared(), vec![slot("5")]);
}

#[test]
fn full_cycle_bumps_throughput_and_durations() {
    let (hub, _store, clock) = hub();

    hub.assign_cage(&slot("5"), "A-1", "driverA1").unwrap();
    hub.call_slot(&slot("5"), "A-1").unwrap();
    clock.advance(std::time::Duration::from_secs(60));
    hub.start_loading(&slot("5"), "A-1").unwrap();
    clock.advance(std::time::Duration::from_secs(120));
    let s = hub.finish_slot(&slot("5"), "admin").unwrap();

    assert_eq!(s.status, SlotStatus::Finished);
    assert_eq!(s.daily_throughput, 1);
    assert_eq!(s.called_duration_s, Some(60));
    assert_eq!(s.loading_duration_s, Some(120));
    assert_eq!(s.total_duration_s, Some(180));
}

#[test]
fn finish_out_of_order_is_a_typed_error() {
    let (hub, _store, _clock) = hub();
    hub.call_slot(&slot("5"), "A-1").unwrap();

    let err = hub.finish_slot(&slot("5"), "admin").unwrap_err();
    assert!(matches!(err, HubError::Slot(SlotError::InvalidTransition { .. })));
    // Slot untouched by the failed transition.
    assert_eq!(hub.get_slot(&slot("5")).status, SlotStatus::Called);
}

#[test]
fn finish_twice_leaves_finished_state() {
    let (hub, _store, _clock) = hub();
    hub.call_slot(&slot("5"), "A-1").unwrap();
    hub.start_loading(&slot("5"), "A-1").unwrap();
    hub.finish_slot(&slot("5"), "admin").unwrap();
    let before = hub.get_slot(&slot("5"));

    assert!(hub.finish_slot(&slot("5"), "admin").is_err());
    assert_eq!(hub.get_slot(&slot("5")), before);
}

#[test]
fn start_loading_auto_promotes_an_uncalled_slot() {
    let (hub, _store, _clock) = hub();
    let s = hub.start_loading(&slot("8"), "b-4").unwrap();

    assert_eq!(s.status, SlotStatus::Loading);
    assert_eq!(s.cage_code.as_ref().map(|c| c.as_str()), Some("B-4"));
    // assign + call + loading, all audited.
    let actions: Vec<_> = s.history.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![HistoryAction::CageAssigned, HistoryAction::Called, HistoryAction::Loading]
    );
}

#[test]
fn malformed_cage_is_rejected_up_front() {
    let (hub, _store, _clock) = hub();
    let err = hub.assign_cage(&slot("1"), "Z-9", "admin").unwrap_err();
    assert_eq!(err, HubError::InvalidCage("Z-9".to_string()));
}

#[test]
fn mutations_coalesce_into_one_durable_write() {
    let (hub, store, clock) = hub();
    hub.call_slot(&slot("5"), "A-1").unwrap();
    hub.toggle_slot_checked(&slot("5"), "admin");
    hub.toggle_slot_checked(&slot("5"), "admin");
    hub.toggle_slot_checked(&slot("5"), "admin");

    let before = store.writes();
    clock.advance(DEBOUNCE_WINDOW);
    assert_eq!(hub.flush_due(), 1);
    assert_eq!(store.writes() - before, 1);

    // The durable record carries the last state.
    let persisted: Slot = store.get_as("slot_5_data").unwrap();
    assert!(persisted.checked);
    // cage_assigned + called + three toggles
    assert_eq!(persisted.history.len(), 5);
}

#[test]
fn slot_survives_a_hub_restart() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    {
        let hub = Hub::new(store.clone(), clock.clone());
        hub.call_slot(&slot("5"), "A-1").unwrap();
        hub.flush_all();
    }
    let hub = Hub::new(store, clock);
    let restored = hub.get_slot(&slot("5"));
    assert_eq!(restored.status, SlotStatus::Called);
    assert_eq!(restored.history.len(), 2);
}

#[test]
fn driver_lookup_is_case_insensitive() {
    let (hub, _store, _clock) = hub();
    hub.set_driver_status("A-1", DriverStatus::EnteringHub, Some(slot("5")));

    let lower = hub.get_driver("a-1").unwrap();
    let upper = hub.get_driver("A-1").unwrap();
    assert_eq!(lower, upper);
}

#[test]
fn driver_lookup_fails_silently_on_malformed_codes() {
    let (hub, _store, _clock) = hub();
    assert!(hub.get_driver("definitely not a cage").is_none());
}

#[test]
fn delayed_then_waiting_outside_clears_everything() {
    let (hub, _store, _clock) = hub();
    hub.set_driver_status("A-1", DriverStatus::Delayed, Some(slot("5")));
    let d = hub.set_driver_status("A-1", DriverStatus::WaitingOutside, None).unwrap();

    assert!(d.assigned_slot.is_none());
    assert!(d.called_at_ms.is_none());
    assert!(d.arrived_at_ms.is_none());
    assert!(!d.checked);
}

#[test]
fn mark_delayed_notifies_and_publishes() {
    let (hub, _store, _clock) = hub();
    let notifier = FakeNotifyAdapter::new();
    let hub = hub.notifier(Arc::new(notifier.clone()));
    let mut rx = hub.bus().subscribe(&[Topic::DriverDelayed]);

    hub.set_driver_status("A-1", DriverStatus::EnteringHub, Some(slot("5")));
    let d = hub.mark_delayed("A-1", Some(slot("5")), false).unwrap();

    assert_eq!(d.status, DriverStatus::Delayed);
    assert_eq!(d.assigned_slot, Some(slot("5")));
    assert_eq!(notifier.calls().len(), 1);
    assert!(notifier.calls()[0].message.contains("A-1"));
    assert!(rx.try_recv().is_ok());
}

#[test]
fn mark_delayed_can_drop_the_slot() {
    let (hub, _store, _clock) = hub();
    hub.set_driver_status("A-1", DriverStatus::EnteringHub, Some(slot("5")));
    let d = hub.mark_delayed("A-1", Some(slot("5")), true).unwrap();
    assert!(d.assigned_slot.is_none());
}

#[test]
fn sweep_flags_only_overdue_drivers() {
    let (hub, _store, clock) = hub();
    let notifier = FakeNotifyAdapter::new();
    let hub = hub.notifier(Arc::new(notifier.clone()));

    hub.set_driver_status("A-1", DriverStatus::EnteringHub, Some(slot("5")));
    clock.advance(std::time::Duration::from_secs(DELAYED_AFTER_S - 30));
    // Called recently; B-2 is still inside its grace period.
    hub.set_driver_status("B-2", DriverStatus::EnteringHub, Some(slot("6")));
    clock.advance(std::time::Duration::from_secs(30));

    let flagged = hub.sweep_delayed();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].as_str(), "A-1");
    assert_eq!(hub.get_driver("A-1").unwrap().status, DriverStatus::Delayed);
    assert_eq!(hub.get_driver("B-2").unwrap().status, DriverStatus::EnteringHub);
    // The sweep keeps the slot the driver was called to.
    assert_eq!(hub.get_driver("A-1").unwrap().assigned_slot, Some(slot("5")));
    assert_eq!(notifier.calls().len(), 1);
}

#[test]
fn import_creates_drivers_and_reports_skips() {
    let (hub, store, clock) = hub();
    let records = vec![
        ImportRecord {
            shift: "AM".into(),
            cage_code: "a-1".into(),
            name: "Marta".into(),
            vehicle_type: None,
        },
        ImportRecord {
            shift: "AM".into(),
            cage_code: "bogus".into(),
            name: "Ghost".into(),
            vehicle_type: None,
        },
    ];

    let (imported, skipped) = hub.import_drivers(&records);
    assert_eq!((imported, skipped), (1, 1));
    assert_eq!(hub.get_driver("A-1").unwrap().name, "Marta");

    // The canonical keyed map is what lands on disk.
    clock.advance(DEBOUNCE_WINDOW);
    hub.flush_due();
    let persisted = store.get(DRIVER_SET_KEY).unwrap();
    assert!(persisted.get("A-1").is_some());
}

#[test]
fn roster_view_is_sorted_by_cage() {
    let (hub, _store, _clock) = hub();
    hub.set_driver_status("C-3", DriverStatus::WaitingOutside, None);
    hub.set_driver_status("A-1", DriverStatus::WaitingOutside, None);
    hub.set_driver_status("B-2", DriverStatus::WaitingOutside, None);

    let drivers = hub.drivers();
    let cages: Vec<&str> = drivers.iter().map(|d| d.cage_code.as_str()).collect();
    assert_eq!(cages, vec!["A-1", "B-2", "C-3"]);
}

#[test]
fn legacy_driver_array_is_read_when_canonical_key_is_absent() {
    let (hub, store, _clock) = hub();
    store
        .set(
            LEGACY_DRIVER_LIST_KEY,
            json!([{"cageCode": "a-1", "name": "Marta", "status": "arrived"}]),
        )
        .unwrap();

    let d = hub.get_driver("A-1").unwrap();
    assert_eq!(d.name, "Marta");
    assert_eq!(d.status, DriverStatus::Arrived);
}

#[test]
fn legacy_no_show_marker_folds_into_status() {
    let (hub, store, _clock) = hub();
    store.set(DRIVER_SET_KEY, json!({"A-1": {"name": "Marta"}})).unwrap();
    store.set("no_show_A-1", json!("no_show")).unwrap();

    assert_eq!(hub.get_driver("A-1").unwrap().status, DriverStatus::NoShow);
}

#[test]
fn reset_system_reinitializes_slots_and_drivers() {
    let (hub, store, _clock) = hub();
    let mut rx = hub.bus().subscribe(&[Topic::Refresh]);

    hub.call_slot(&slot("5"), "A-1").unwrap();
    hub.set_driver_status("A-1", DriverStatus::EnteringHub, Some(slot("5")));
    store.set("no_show_A-1", json!("no_show")).unwrap();

    hub.reset_system();

    let s = hub.get_slot(&slot("5"));
    assert_eq!(s.status, SlotStatus::Waiting);
    assert!(s.cage_code.is_none());
    assert!(s.history.is_empty());
    assert_eq!(s.daily_throughput, 0);

    let d = hub.get_driver("A-1").unwrap();
    assert_eq!(d.status, DriverStatus::WaitingOutside);
    assert!(d.assigned_slot.is_none());

    assert!(store.get("no_show_A-1").is_none());
    // Reset writes are immediate, not debounced.
    let persisted: Slot = store.get_as("slot_5_data").unwrap();
    assert_eq!(persisted.status, SlotStatus::Waiting);
    assert!(rx.try_recv().is_ok());
}

#[test]
fn remote_rows_feed_the_local_paths() {
    let (hub, _store, _clock) = hub();
    let mut rx = hub.bus().subscribe(&[Topic::Refresh, Topic::SlotUpdated]);

    let applied = hub
        .apply_remote_slot(json!({"id": "7", "status": "called", "cageCode": "C-2", "called_at_ms": 9000}))
        .unwrap();

    assert_eq!(applied.status, SlotStatus::Called);
    assert_eq!(hub.get_slot(&slot("7")).status, SlotStatus::Called);
    assert!(rx.try_recv().is_ok());
}

#[test]
fn remote_row_without_id_is_ignored() {
    let (hub, _store, _clock) = hub();
    assert!(hub.apply_remote_slot(json!({"status": "called"})).is_none());
}

#[test]
fn slot_events_reach_subscribers_once_per_transition() {
    let (hub, _store, _clock) = hub();
    let mut rx = hub.bus().subscribe(&[Topic::SlotUpdated]);

    hub.assign_cage(&slot("5"), "A-1", "admin").unwrap();
    hub.call_slot(&slot("5"), "A-1").unwrap();

    let first = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();
    assert!(matches!(first, Event::SlotUpdated { action: HistoryAction::CageAssigned, .. }));
    assert!(matches!(second, Event::SlotUpdated { action: HistoryAction::Called, .. }));
}

#[test]
fn slots_listing_covers_the_configured_range() {
    let (hub, _store, _clock) = hub();
    let hub = hub.slot_count(4);
    let slots = hub.slots();
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0].id, "1");
    assert_eq!(slots[3].id, "4");
}
