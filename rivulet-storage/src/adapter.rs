//! Persistent store adapter for the cache table.
//!
//! The store may or may not be usable in the current context (quota, disabled
//! storage, broken backend). [`CacheStore::resolve`] probes it once and picks
//! one of two variants: `Available` reads and writes the table, `Unavailable`
//! behaves as an always-empty table that drops writes. Every failure after
//! that point is logged and swallowed, so the cache always fails open to
//! "nothing cached".

use std::sync::Arc;

use rivulet_core::{StoreError, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::kv::KeyValueStore;
use crate::table::{CacheTable, CachedEntry};

/// Sentinel key used by [`probe`].
pub const PROBE_KEY: &str = "__test__";

/// Check whether `backend` accepts a write and a delete right now.
///
/// Never fails; any error means "unusable".
pub fn probe(backend: &dyn KeyValueStore) -> bool {
    let result = backend
        .set_item(PROBE_KEY, PROBE_KEY)
        .and_then(|()| backend.remove_item(PROBE_KEY));

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Key-value store probe failed, caching disabled");
            false
        }
    }
}

/// Cache table access over a store that may be unavailable.
#[derive(Clone)]
pub enum CacheStore {
    Available {
        backend: Arc<dyn KeyValueStore>,
        table_key: String,
    },
    Unavailable,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available { table_key, .. } => f
                .debug_struct("Available")
                .field("table_key", table_key)
                .finish_non_exhaustive(),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

impl CacheStore {
    /// Probe `backend` and select the matching variant.
    pub fn resolve(backend: Arc<dyn KeyValueStore>, table_key: impl Into<String>) -> Self {
        if probe(backend.as_ref()) {
            Self::Available {
                backend,
                table_key: table_key.into(),
            }
        } else {
            Self::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// Read the whole table. Absent, corrupt or unreadable data is an empty table.
    pub fn read_table(&self) -> CacheTable {
        let Self::Available { backend, table_key } = self else {
            return CacheTable::new();
        };

        let blob = match backend.get_item(table_key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return CacheTable::new(),
            Err(e) => {
                tracing::warn!(table_key = %table_key, error = %e, "Failed to read cache table");
                return CacheTable::new();
            }
        };

        match serde_json::from_str::<Option<CacheTable>>(&blob) {
            Ok(table) => table.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    table_key = %table_key,
                    error = %e,
                    "Corrupt cache table, treating as empty"
                );
                CacheTable::new()
            }
        }
    }

    /// Write the whole table back. Failures are logged and dropped.
    pub fn write_table(&self, table: &CacheTable) {
        let Self::Available { backend, table_key } = self else {
            return;
        };

        if let Err(e) = Self::try_write(backend.as_ref(), table_key, table) {
            tracing::warn!(table_key = %table_key, error = %e, "Failed to write cache table");
        }
    }

    fn try_write(
        backend: &dyn KeyValueStore,
        table_key: &str,
        table: &CacheTable,
    ) -> Result<(), StoreError> {
        let blob = serde_json::to_string(table)?;
        backend.set_item(table_key, &blob)
    }

    /// Entry for `key`, decoded as `T`.
    pub fn entry<T: DeserializeOwned>(&self, key: &str) -> Option<CachedEntry<T>> {
        self.read_table().get_typed(key)
    }

    /// Overwrite the entry for `key`.
    ///
    /// Reads the table, replaces one entry and writes the table back without
    /// holding any lock across the two steps. Concurrent writers race and the
    /// last write wins.
    pub fn set_entry<T: Serialize>(&self, key: &str, value: &T, cached_at: Timestamp) {
        if !self.is_available() {
            return;
        }

        let mut table = self.read_table();
        if let Err(e) = table.insert(&CachedEntry::new(key, cached_at, value)) {
            tracing::warn!(key, error = %e, "Value is not serializable, skipping cache write");
            return;
        }
        self.write_table(&table);
    }
}
