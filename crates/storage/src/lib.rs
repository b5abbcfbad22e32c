// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ds-storage: durable key-value adapter, read cache, and entity normalizer
//!
//! The durable store is shared, unsynchronized, last-writer-wins state:
//! there is no locking, no transaction, and no conflict detection. Two
//! processes mutating the same slot concurrently can lose one side's
//! update. That is an accepted limitation of the domain (one physical hub,
//! low write contention), documented here rather than papered over.

mod cache;
mod import;
mod keys;
mod normalize;
mod store;

pub use cache::{CachedStore, READ_CACHE_TTL};
pub use import::{drivers_from_records, ImportRecord};
pub use keys::{
    no_show_marker_key, slot_data_key, DRIVER_SET_KEY, LEGACY_DRIVER_LIST_KEY, UPDATE_MARKER_KEY,
};
pub use normalize::{apply_no_show_marker, driver_roster, driver_set_from_value, slot_from_value};
pub use store::{JsonFileStore, MemoryStore, StoreAdapter, StoreError, CURRENT_STORE_VERSION};
