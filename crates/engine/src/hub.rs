// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hub service: every dashboard operation enters here.
//!
//! Operations are synchronous (state is updated before the call returns)
//! while durable writes are debounced and mirror traffic drains in the
//! background. Entities are created lazily on first reference: reading an
//! unknown slot yields a fresh default record, never an error.

use crate::bus::SyncBus;
use crate::debounce::{WriteCoordinator, FLUSH_TICK};
use crate::mirror::{MirrorOp, SyncStatus};
use crate::monitor::DELAYED_AFTER_S;
use ds_adapters::{AlertSink, NotifyAdapter, TracingAlertSink, TracingNotifyAdapter};
use ds_core::{
    CageCode, Clock, Driver, DriverStatus, Event, Slot, SlotError, SlotId,
};
use ds_storage::{
    apply_no_show_marker, driver_roster, driver_set_from_value, drivers_from_records,
    no_show_marker_key, slot_data_key, slot_from_value, CachedStore, ImportRecord, StoreAdapter,
    DRIVER_SET_KEY, LEGACY_DRIVER_LIST_KEY,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Number of physical loading positions in the hub.
pub const DEFAULT_SLOT_COUNT: u16 = 30;

/// Errors surfaced to callers of hub operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error("malformed cage code: {0:?}")]
    InvalidCage(String),
}

#[derive(Default)]
struct HubState {
    slots: HashMap<SlotId, Slot>,
    drivers: HashMap<CageCode, Driver>,
    drivers_loaded: bool,
}

/// The dock/slot management service.
pub struct Hub<S: StoreAdapter, C: Clock> {
    store: Arc<CachedStore<S, C>>,
    writer: WriteCoordinator<CachedStore<S, C>, C>,
    bus: SyncBus<CachedStore<S, C>, C>,
    clock: C,
    slot_count: u16,
    state: Mutex<HubState>,
    alerts: Arc<dyn AlertSink>,
    notifier: Arc<dyn NotifyAdapter>,
    mirror_tx: mpsc::UnboundedSender<MirrorOp>,
    mirror_rx: Mutex<Option<mpsc::UnboundedReceiver<MirrorOp>>>,
    sync_status: SyncStatus,
}

impl<S: StoreAdapter, C: Clock> Hub<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        let store = Arc::new(CachedStore::new(store, clock.clone()));
        let writer = WriteCoordinator::new(Arc::clone(&store), clock.clone());
        let bus = SyncBus::new(Arc::clone(&store), clock.clone());
        let (mirror_tx, mirror_rx) = mpsc::unbounded_channel();
        Self {
            store,
            writer,
            bus,
            clock,
            slot_count: DEFAULT_SLOT_COUNT,
            state: Mutex::new(HubState::default()),
            alerts: Arc::new(TracingAlertSink),
            notifier: Arc::new(TracingNotifyAdapter),
            mirror_tx,
            mirror_rx: Mutex::new(Some(mirror_rx)),
            sync_status: SyncStatus::default(),
        }
    }

    ds_core::setters! {
        set {
            slot_count: u16,
            alerts: Arc<dyn AlertSink>,
            notifier: Arc<dyn NotifyAdapter>,
        }
    }

    /// The synchronization bus, for views to subscribe on.
    pub fn bus(&self) -> &SyncBus<CachedStore<S, C>, C> {
        &self.bus
    }

    /// Snapshot handle of the remote-mirror health indicator.
    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status.clone()
    }

    /// Hand over the mirror op queue to a [`crate::MirrorPump`]. One-shot.
    pub fn take_mirror_ops(&self) -> Option<mpsc::UnboundedReceiver<MirrorOp>> {
        self.mirror_rx.lock().take()
    }

    // ---- slots ----

    /// Read a slot, creating the default record on first reference.
    pub fn get_slot(&self, id: &SlotId) -> Slot {
        let mut guard = self.state.lock();
        self.load_slot(&mut guard, id).clone()
    }

    /// All slots in the configured range, in position order.
    pub fn slots(&self) -> Vec<Slot> {
        let mut guard = self.state.lock();
        (1..=self.slot_count)
            .map(|n| self.load_slot(&mut guard, &SlotId::new(n.to_string())).clone())
            .collect()
    }

    /// Assign a cage to a slot. Overwriting another cage is allowed.
    pub fn assign_cage(&self, id: &SlotId, cage: &str, actor: &str) -> Result<Slot, HubError> {
        let cage = self.parse_cage(cage)?;
        Ok(self.mutate_slot(id, |slot, now| slot.assign_cage(cage.clone(), actor, now)))
    }

    /// Call a cage to a slot, auto-assigning the cage if needed.
    ///
    /// Clears any stale alerts for the slot via the alert collaborator.
    pub fn call_slot(&self, id: &SlotId, cage: &str) -> Result<Slot, HubError> {
        let cage = self.parse_cage(cage)?;
        let slot = self.mutate_slot(id, |slot, now| {
            slot.ensure_called(&cage, cage.as_str(), now);
        });
        self.alerts.clear_alerts(id);
        self.bus.publish(&Event::AlertsCleared { slot: id.clone(), at_ms: slot.last_update_ms });
        Ok(slot)
    }

    /// Begin loading, auto-promoting through `called` when needed.
    ///
    /// The tolerant promotion is the composition of the core's explicit
    /// `ensure_called` with its strict `start_loading`.
    pub fn start_loading(&self, id: &SlotId, cage: &str) -> Result<Slot, HubError> {
        let cage = self.parse_cage(cage)?;
        self.try_mutate_slot(id, |slot, now| {
            slot.ensure_called(&cage, cage.as_str(), now);
            slot.start_loading(cage.as_str(), now)
        })
    }

    /// Finish the cycle. Fails unless the slot is currently `loading`.
    pub fn finish_slot(&self, id: &SlotId, actor: &str) -> Result<Slot, HubError> {
        self.try_mutate_slot(id, |slot, now| slot.finish(actor, now))
    }

    /// Reset a slot to `waiting` from any state.
    pub fn reset_slot(&self, id: &SlotId, actor: &str) -> Slot {
        self.mutate_slot(id, |slot, now| slot.reset(actor, now))
    }

    /// Flip a slot's manual check flag.
    pub fn toggle_slot_checked(&self, id: &SlotId, actor: &str) -> Slot {
        self.mutate_slot(id, |slot, now| slot.toggle_checked(actor, now))
    }

    // ---- drivers ----

    /// Look up a driver by cage code, case-insensitively.
    ///
    /// Malformed codes fail silently with `None`; callers decide messaging.
    pub fn get_driver(&self, cage: &str) -> Option<Driver> {
        let cage = CageCode::parse(cage)?;
        let mut guard = self.state.lock();
        self.load_drivers(&mut guard).get(&cage).cloned()
    }

    /// The legacy array view of the driver set, ordered by cage code.
    pub fn drivers(&self) -> Vec<Driver> {
        let mut guard = self.state.lock();
        driver_roster(self.load_drivers(&mut guard))
    }

    /// Generic driver transition with status-specific side effects.
    ///
    /// Creates the driver record on first reference. Returns `None` only
    /// for malformed cage codes.
    pub fn set_driver_status(
        &self,
        cage: &str,
        status: DriverStatus,
        slot: Option<SlotId>,
    ) -> Option<Driver> {
        let cage = CageCode::parse(cage)?;
        let driver =
            self.mutate_driver(&cage, |driver, now| driver.set_status(status, slot.clone(), now));
        self.publish_driver_status(&driver);
        Some(driver)
    }

    /// Mark a driver delayed and notify the operator.
    ///
    /// With `remove_from_slot` the slot assignment is dropped; otherwise
    /// the supplied slot is kept on the record.
    pub fn mark_delayed(
        &self,
        cage: &str,
        slot: Option<SlotId>,
        remove_from_slot: bool,
    ) -> Option<Driver> {
        let cage = CageCode::parse(cage)?;
        let slot = if remove_from_slot { None } else { slot };
        Some(self.mark_delayed_inner(&cage, slot))
    }

    /// Flip a driver's check flag without changing status.
    pub fn toggle_driver_checked(&self, cage: &str) -> Option<Driver> {
        let cage = CageCode::parse(cage)?;
        let driver = self.mutate_driver(&cage, |driver, now| driver.toggle_checked(now));
        self.publish_driver_status(&driver);
        Some(driver)
    }

    /// Send a driver back to `waiting_outside`.
    pub fn reset_driver(&self, cage: &str) -> Option<Driver> {
        let cage = CageCode::parse(cage)?;
        let driver = self.mutate_driver(&cage, |driver, now| driver.reset(now));
        self.publish_driver_status(&driver);
        Some(driver)
    }

    /// Bulk-create drivers from spreadsheet import records.
    ///
    /// Returns `(imported, skipped)`.
    pub fn import_drivers(&self, records: &[ImportRecord]) -> (usize, usize) {
        let now = self.clock.epoch_ms();
        let (new_set, skipped) = drivers_from_records(records, now);
        let imported = new_set.len();
        let set_value = {
            let mut guard = self.state.lock();
            let drivers = self.load_drivers(&mut guard);
            for (cage, driver) in new_set {
                drivers.insert(cage, driver);
            }
            driver_set_value(drivers)
        };
        if let Some(value) = set_value {
            self.schedule_write(DRIVER_SET_KEY, value);
        }
        self.bus.publish(&Event::Refresh { at_ms: now });
        (imported, skipped)
    }

    /// Mark every overdue `entering_hub` driver as delayed.
    ///
    /// Poll-based soft heuristic, not a hard timeout: the sweep runs
    /// periodically and flags drivers whose call is older than the
    /// threshold with no transition since.
    pub fn sweep_delayed(&self) -> Vec<CageCode> {
        let now = self.clock.epoch_ms();
        let overdue: Vec<(CageCode, Option<SlotId>)> = {
            let mut guard = self.state.lock();
            self.load_drivers(&mut guard)
                .values()
                .filter(|d| d.is_overdue(DELAYED_AFTER_S, now))
                .map(|d| (d.cage_code.clone(), d.assigned_slot.clone()))
                .collect()
        };
        for (cage, slot) in &overdue {
            self.mark_delayed_inner(cage, slot.clone());
        }
        overdue.into_iter().map(|(cage, _)| cage).collect()
    }

    // ---- system ----

    /// Re-initialize every slot and send every driver back outside.
    ///
    /// The one operation that discards history: slots come back as fresh
    /// records. Legacy no-show markers are cleared along the way. Writes
    /// happen immediately, not debounced; pending writes are flushed
    /// first so a stale value cannot land after the reset.
    pub fn reset_system(&self) {
        let now = self.clock.epoch_ms();
        self.writer.flush_all();
        let (slots, set_value, marker_keys) = {
            let mut guard = self.state.lock();
            let mut slots = Vec::with_capacity(self.slot_count as usize);
            for n in 1..=self.slot_count {
                let id = SlotId::new(n.to_string());
                let slot = Slot::new(id.clone());
                guard.slots.insert(id, slot.clone());
                slots.push(slot);
            }
            let drivers = self.load_drivers(&mut guard);
            let marker_keys: Vec<String> = drivers.keys().map(no_show_marker_key).collect();
            for driver in drivers.values_mut() {
                driver.reset(now);
            }
            (slots, driver_set_value(drivers), marker_keys)
        };
        for slot in &slots {
            match serde_json::to_value(slot) {
                Ok(value) => {
                    if let Err(err) = self.store.set(&slot_data_key(&slot.id), value) {
                        tracing::warn!(slot = %slot.id, error = %err, "reset write failed");
                    }
                }
                Err(err) => {
                    tracing::warn!(slot = %slot.id, error = %err, "unserializable slot record");
                }
            }
            let _ = self.mirror_tx.send(MirrorOp::UpsertSlot(slot.clone()));
        }
        if let Some(value) = set_value {
            if let Err(err) = self.store.set(DRIVER_SET_KEY, value) {
                tracing::warn!(error = %err, "reset write failed for driver set");
            }
        }
        for key in marker_keys {
            self.store.remove(&key);
        }
        self.bus.publish(&Event::Refresh { at_ms: now });
    }

    /// Apply a full-row slot snapshot delivered by the remote change feed.
    ///
    /// Feeds the same in-memory + cache path as a local write, then
    /// republishes on the bus. Does not echo back to the mirror.
    pub fn apply_remote_slot(&self, row: Value) -> Option<Slot> {
        let id = SlotId::new(row.get("id").and_then(Value::as_str)?);
        let slot = slot_from_value(&id, row);
        self.state.lock().slots.insert(id.clone(), slot.clone());
        match serde_json::to_value(&slot) {
            Ok(value) => self.schedule_write(&slot_data_key(&id), value),
            Err(err) => {
                tracing::warn!(slot = %id, error = %err, "unserializable remote slot");
            }
        }
        match slot.last_entry() {
            Some(entry) => {
                self.bus.publish(&Event::SlotUpdated {
                    id: slot.id.clone(),
                    cage: slot.cage_code.clone(),
                    action: entry.action,
                    at_ms: entry.at_ms,
                });
            }
            None => {
                self.bus.publish(&Event::Refresh { at_ms: self.clock.epoch_ms() });
            }
        }
        Some(slot)
    }

    // ---- persistence plumbing ----

    /// Number of writes waiting in the debounce window.
    pub fn pending_writes(&self) -> usize {
        self.writer.pending_len()
    }

    /// Write out pending entries whose debounce window elapsed.
    pub fn flush_due(&self) -> usize {
        self.writer.flush_due()
    }

    /// Write out everything pending immediately.
    pub fn flush_all(&self) -> usize {
        self.writer.flush_all()
    }

    /// Background flush loop; flushes everything once shutdown is signaled.
    pub async fn run_flusher(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(FLUSH_TICK);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.writer.flush_due();
                }
                _ = shutdown.changed() => {
                    self.writer.flush_all();
                    break;
                }
            }
        }
    }

    // ---- internals ----

    fn parse_cage(&self, cage: &str) -> Result<CageCode, HubError> {
        CageCode::parse(cage).ok_or_else(|| HubError::InvalidCage(cage.to_string()))
    }

    fn load_slot<'a>(&self, state: &'a mut HubState, id: &SlotId) -> &'a mut Slot {
        state.slots.entry(id.clone()).or_insert_with(|| {
            match self.store.get(&slot_data_key(id)) {
                Some(value) => slot_from_value(id, value),
                None => Slot::new(id.clone()),
            }
        })
    }

    fn load_drivers<'a>(&self, state: &'a mut HubState) -> &'a mut HashMap<CageCode, Driver> {
        if !state.drivers_loaded {
            let mut set = match self.store.get(DRIVER_SET_KEY) {
                Some(value) => driver_set_from_value(value),
                // Canonical key absent: fall back to the legacy array.
                None => match self.store.get(LEGACY_DRIVER_LIST_KEY) {
                    Some(value) => driver_set_from_value(value),
                    None => HashMap::new(),
                },
            };
            for (cage, driver) in set.iter_mut() {
                if let Some(marker) = self.store.get(&no_show_marker_key(cage)) {
                    apply_no_show_marker(driver, &marker);
                }
            }
            state.drivers = set;
            state.drivers_loaded = true;
        }
        &mut state.drivers
    }

    fn mutate_slot(&self, id: &SlotId, f: impl FnOnce(&mut Slot, u64)) -> Slot {
        let now = self.clock.epoch_ms();
        let snapshot = {
            let mut guard = self.state.lock();
            let slot = self.load_slot(&mut guard, id);
            f(slot, now);
            slot.clone()
        };
        self.persist_slot(&snapshot);
        snapshot
    }

    fn try_mutate_slot(
        &self,
        id: &SlotId,
        f: impl FnOnce(&mut Slot, u64) -> Result<(), SlotError>,
    ) -> Result<Slot, HubError> {
        let now = self.clock.epoch_ms();
        let snapshot = {
            let mut guard = self.state.lock();
            let slot = self.load_slot(&mut guard, id);
            f(slot, now)?;
            slot.clone()
        };
        self.persist_slot(&snapshot);
        Ok(snapshot)
    }

    fn mutate_driver(&self, cage: &CageCode, f: impl FnOnce(&mut Driver, u64)) -> Driver {
        let now = self.clock.epoch_ms();
        let (snapshot, set_value) = {
            let mut guard = self.state.lock();
            let drivers = self.load_drivers(&mut guard);
            let driver =
                drivers.entry(cage.clone()).or_insert_with(|| Driver::new(cage.clone(), ""));
            f(driver, now);
            let snapshot = driver.clone();
            (snapshot, driver_set_value(drivers))
        };
        if let Some(value) = set_value {
            self.schedule_write(DRIVER_SET_KEY, value);
        }
        snapshot
    }

    fn mark_delayed_inner(&self, cage: &CageCode, slot: Option<SlotId>) -> Driver {
        let driver = self.mutate_driver(cage, |driver, now| {
            driver.set_status(DriverStatus::Delayed, slot.clone(), now)
        });
        let message = match &driver.assigned_slot {
            Some(slot) => format!("{cage} has not arrived at slot {slot}"),
            None => format!("{cage} has not arrived"),
        };
        self.notifier.notify("Driver delayed", &message);
        self.bus.publish(&Event::DriverDelayed {
            cage: cage.clone(),
            slot: driver.assigned_slot.clone(),
            at_ms: driver.last_update_ms,
        });
        self.publish_driver_status(&driver);
        driver
    }

    fn publish_driver_status(&self, driver: &Driver) {
        self.bus.publish(&Event::DriverStatusChanged {
            cage: driver.cage_code.clone(),
            status: driver.status,
            slot: driver.assigned_slot.clone(),
            at_ms: driver.last_update_ms,
        });
    }

    fn persist_slot(&self, slot: &Slot) {
        match serde_json::to_value(slot) {
            Ok(value) => self.schedule_write(&slot_data_key(&slot.id), value),
            Err(err) => {
                tracing::warn!(slot = %slot.id, error = %err, "unserializable slot record");
            }
        }
        // A closed channel just means no mirror pump is attached.
        let _ = self.mirror_tx.send(MirrorOp::UpsertSlot(slot.clone()));
        if let Some(entry) = slot.last_entry() {
            self.bus.publish(&Event::SlotUpdated {
                id: slot.id.clone(),
                cage: slot.cage_code.clone(),
                action: entry.action,
                at_ms: entry.at_ms,
            });
        }
    }

    fn schedule_write(&self, key: &str, value: Value) {
        self.store.prime(key, value.clone());
        self.writer.schedule(key, value);
    }
}

/// Serialize the canonical driver map, logging instead of failing.
fn driver_set_value(drivers: &HashMap<CageCode, Driver>) -> Option<Value> {
    match serde_json::to_value(drivers) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "unserializable driver set");
            None
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
