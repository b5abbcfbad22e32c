// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity normalizer: loosely-typed persisted records to canonical shapes.
//!
//! The store has accumulated several generations of record shapes: bare
//! slots, camelCase field names, drivers as a flat array, drivers as a
//! keyed map, out-of-band no-show markers. Everything coerces to the two
//! canonical entities here; a record that cannot be coerced at all is
//! treated as absent and recreated fresh.

use ds_core::{CageCode, Driver, DriverStatus, Slot, SlotId};
use serde_json::Value;
use std::collections::HashMap;

/// Coerce a persisted slot record, filling defaults for missing fields.
///
/// The id under which the record was stored wins over whatever id the
/// record itself claims.
pub fn slot_from_value(id: &SlotId, value: Value) -> Slot {
    match serde_json::from_value::<Slot>(value) {
        Ok(mut slot) => {
            slot.id = id.clone();
            slot
        }
        Err(err) => {
            tracing::warn!(slot = %id, error = %err, "unreadable slot record, recreating fresh");
            Slot::new(id.clone())
        }
    }
}

/// Coerce a persisted driver set from either legacy shape.
///
/// Accepts the canonical keyed map (`{"A-1": {...}}`) and the legacy flat
/// array (`[{...}]`). Entries with malformed cage codes are skipped with a
/// warning; map keys are canonicalized, and the key wins over the record's
/// own cage field.
pub fn driver_set_from_value(value: Value) -> HashMap<CageCode, Driver> {
    let mut set = HashMap::new();
    match value {
        Value::Array(items) => {
            for item in items {
                match serde_json::from_value::<Driver>(item) {
                    Ok(driver) => {
                        set.insert(driver.cage_code.clone(), driver);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping unreadable driver record");
                    }
                }
            }
        }
        Value::Object(entries) => {
            for (key, item) in entries {
                let Some(cage) = CageCode::parse(&key) else {
                    tracing::warn!(key, "skipping driver under malformed cage key");
                    continue;
                };
                // Inject the canonical cage so records stored without one
                // (the map shape predates the embedded field) still parse.
                let mut item = item;
                if let Value::Object(fields) = &mut item {
                    fields.insert("cage_code".to_string(), Value::String(cage.to_string()));
                }
                match serde_json::from_value::<Driver>(item) {
                    Ok(driver) => {
                        set.insert(cage, driver);
                    }
                    Err(err) => {
                        tracing::warn!(cage = %cage, error = %err, "skipping unreadable driver record");
                    }
                }
            }
        }
        other => {
            tracing::warn!(
                kind = %json_kind(&other),
                "driver set is neither array nor map, starting empty"
            );
        }
    }
    set
}

/// Pure projection of the canonical driver map into the legacy array view,
/// ordered by cage code so the output is stable.
pub fn driver_roster(set: &HashMap<CageCode, Driver>) -> Vec<Driver> {
    let mut roster: Vec<Driver> = set.values().cloned().collect();
    roster.sort_by(|a, b| a.cage_code.cmp(&b.cage_code));
    roster
}

/// Fold a legacy out-of-band no-show marker into the driver's status.
///
/// Markers were written as either a bare string or `{"status": "..."}`.
pub fn apply_no_show_marker(driver: &mut Driver, marker: &Value) {
    let tag = match marker {
        Value::String(s) => Some(s.as_str()),
        Value::Object(fields) => fields.get("status").and_then(Value::as_str),
        _ => None,
    };
    match tag {
        Some("no_show") => driver.status = DriverStatus::NoShow,
        Some("no_show_reversed") => driver.status = DriverStatus::NoShowReversed,
        _ => {}
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
