//! Typed key/value persistence.
//!
//! Every persisted value goes through [`Persistence::load`] and
//! [`Persistence::save`]. Reads never fail: a missing key or a malformed
//! payload yields the type's default, so corrupt storage degrades to an
//! unconfigured view instead of an error.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::booth::Label;
use crate::hit::normalize_degrees;
use crate::numeric::value_number;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage write failed: {0}")]
    Storage(String),
}

/// A string key/value backend.
pub trait Store {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`PersistError::Storage`] when the backend rejects the write.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;

    /// # Errors
    ///
    /// Returns [`PersistError::Storage`] when the backend rejects the removal.
    fn remove(&mut self, key: &str) -> Result<(), PersistError>;
}

/// In-process store for native use and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore(HashMap<String, String>);

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.0.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.0.remove(key);
        Ok(())
    }
}

/// Browser `localStorage`. Without storage access every read is empty and
/// every write is dropped.
pub struct LocalStore {
    storage: Option<web_sys::Storage>,
}

impl LocalStore {
    #[must_use]
    pub fn new() -> Self {
        let storage = match web_sys::window().map(|w| w.local_storage()) {
            Some(Ok(storage)) => storage,
            Some(Err(e)) => {
                tracing::warn!(error = ?e, "localStorage unavailable");
                None
            }
            None => None,
        };
        Self { storage }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.storage.as_ref()?.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = ?e, "localStorage read failed");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        storage.set_item(key, value).map_err(|e| PersistError::Storage(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        storage.remove_item(key).map_err(|e| PersistError::Storage(format!("{e:?}")))
    }
}

/// JSON (de)serialization over a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct Persistence<S> {
    store: S,
}

impl<S: Store> Persistence<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Read `key`, falling back to `T::default()` when absent or malformed.
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.store.get(key) else {
            return T::default();
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "malformed persisted value, using default");
                T::default()
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error when encoding fails or the store rejects the write.
    pub fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), PersistError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)
    }

    /// # Errors
    ///
    /// Returns an error when the store rejects the removal.
    pub fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.store.remove(key)
    }
}

// =============================================================
// Persisted shapes
// =============================================================

/// User displacement of one group, in content units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
}

pub type OffsetMap = BTreeMap<Label, Offset>;

/// Per-label rotation in `[0, 360)`. Loads numbers or numeric strings and
/// drops anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>")]
pub struct RotationMap(BTreeMap<Label, f64>);

impl From<BTreeMap<String, Value>> for RotationMap {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        Self(
            raw.into_iter()
                .filter_map(|(label, v)| value_number(&v).map(|deg| (label, normalize_degrees(deg))))
                .collect(),
        )
    }
}

impl RotationMap {
    /// Degrees for `label`; unrotated when unknown.
    #[must_use]
    pub fn get(&self, label: &str) -> f64 {
        self.0.get(label).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, label: &str, deg: f64) {
        self.0.insert(label.to_owned(), normalize_degrees(deg));
    }

    pub fn remove(&mut self, label: &str) {
        self.0.remove(label);
    }
}

/// Active label and multi-selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedSelection {
    pub active_label: Option<Label>,
    pub selected_labels: Vec<Label>,
}

/// A named copy of the offset map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Milliseconds since the epoch.
    pub saved_at: f64,
    pub offsets: OffsetMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotBook(BTreeMap<String, Snapshot>);

impl SnapshotBook {
    /// Store `offsets` under the trimmed `name`. Blank names are refused.
    pub fn insert(&mut self, name: &str, saved_at: f64, offsets: OffsetMap) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.0.insert(name.to_owned(), Snapshot { saved_at, offsets });
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Snapshot> {
        self.0.get(name.trim())
    }

    /// Snapshot names, most recently saved first.
    #[must_use]
    pub fn names_newest_first(&self) -> Vec<String> {
        let mut entries: Vec<(&String, f64)> = self.0.iter().map(|(n, s)| (n, s.saved_at)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().map(|(n, _)| n.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
