// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value store adapters.
//!
//! Keys are flat namespaced strings (`slot_5_data`, `driver_data_obj`).
//! Values are JSON. A read of a malformed value is logged and reported as
//! "absent" so callers recreate the entity fresh instead of failing.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Current on-disk envelope version
pub const CURRENT_STORE_VERSION: u32 = 1;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value interface over persistent storage.
///
/// `get` returns `None` for both "missing" and "unreadable": persistence
/// problems never interrupt the user-facing flow; in-memory state stays the
/// source of truth for the session.
pub trait StoreAdapter: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&self, key: &str);

    /// Typed read; malformed records are logged and treated as absent.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T>
    where
        Self: Sized,
    {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(key, error = %err, "malformed persisted record, treating as absent");
                None
            }
        }
    }

    /// Typed write.
    fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        self.set(key, serde_json::to_value(value)?)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls accepted so far. Lets tests assert coalescing.
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl StoreAdapter for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value);
        *self.writes.lock() += 1;
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Envelope wrapped around every durable value.
///
/// Versioned for migrations; `written_at` aids debugging a hub where several
/// views write the same keys.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "v")]
    version: u32,
    written_at: DateTime<Utc>,
    data: Value,
}

/// File-backed store: one JSON document per key under a root directory.
///
/// Writes go through a temp file and rename so a crash mid-write leaves the
/// previous document intact. Values read without an envelope (legacy
/// documents) are returned as-is.
#[derive(Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl StoreAdapter for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read persisted record");
                return None;
            }
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "unparseable persisted record, treating as absent");
                return None;
            }
        };
        // Envelope-wrapped documents unwrap to their payload; anything else
        // is a legacy document stored bare.
        match serde_json::from_value::<Envelope>(value.clone()) {
            Ok(envelope) => Some(envelope.data),
            Err(_) => Some(value),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let envelope = Envelope {
            version: CURRENT_STORE_VERSION,
            written_at: Utc::now(),
            data: value,
        };
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&envelope)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(key, error = %err, "failed to remove persisted record");
            }
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
