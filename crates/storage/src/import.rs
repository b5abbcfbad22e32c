// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spreadsheet import contract.
//!
//! The import tool (out of scope here) parses the roster spreadsheet and
//! hands over flat records; this module turns them into fresh driver
//! entities. Parsing the spreadsheet itself never happens in this crate.

use ds_core::{CageCode, Driver};
use serde::Deserialize;
use std::collections::HashMap;

/// One roster row as produced by the spreadsheet import tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// Shift label, used by views for grouping; not part of the driver record.
    #[serde(default)]
    pub shift: String,
    pub cage_code: String,
    pub name: String,
    #[serde(default)]
    pub vehicle_type: Option<String>,
}

/// Bulk-create drivers from import records.
///
/// Malformed cage codes are skipped, not fatal; a roster typo should not
/// sink the rest of the sheet. Returns the created set and the skip count.
pub fn drivers_from_records(
    records: &[ImportRecord],
    now_ms: u64,
) -> (HashMap<CageCode, Driver>, usize) {
    let mut set = HashMap::new();
    let mut skipped = 0;
    for record in records {
        let Some(cage) = CageCode::parse(&record.cage_code) else {
            tracing::warn!(cage = %record.cage_code, name = %record.name, "skipping roster row with malformed cage code");
            skipped += 1;
            continue;
        };
        let mut driver = Driver::new(cage.clone(), record.name.clone());
        driver.vehicle_type = record.vehicle_type.clone();
        driver.last_update_ms = now_ms;
        set.insert(cage, driver);
    }
    (set, skipped)
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
