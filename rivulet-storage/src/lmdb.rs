//! LMDB-backed key-value store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to persist the cache table
//! across process restarts. Keys and values are stored as UTF-8 bytes in a
//! single unnamed database.
//!
//! # Transactions
//!
//! Each [`KeyValueStore`] call runs in its own LMDB transaction. Nothing spans
//! two calls, so the cache table's read-modify-write stays unsynchronized
//! exactly as it is with any other backend.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use rivulet_core::StoreError;

use crate::kv::KeyValueStore;

/// Error type for LMDB store setup and operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes were not valid UTF-8.
    #[error("Invalid UTF-8 value under key {0}")]
    InvalidUtf8(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            // A full map is LMDB's version of a quota failure; keep the detail.
            LmdbStoreError::Transaction(reason) if reason.contains("MDB_MAP_FULL") => {
                StoreError::Unavailable { reason }
            }
            other => StoreError::Backend {
                reason: other.to_string(),
            },
        }
    }
}

/// LMDB-backed store.
///
/// # Example
///
/// ```ignore
/// use rivulet_storage::{KeyValueStore, LmdbStore};
///
/// let store = LmdbStore::new("/tmp/rivulet-cache", 10)?;
/// store.set_item("dataCache", "{}")?;
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), max_size_mb, "Opened LMDB store");

        Ok(Self { env, db })
    }

    fn read(&self, key: &str) -> Result<Option<String>, LmdbStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        match self.db.get(&rtxn, key.as_bytes()) {
            Ok(Some(bytes)) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| LmdbStoreError::InvalidUtf8(key.to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(LmdbStoreError::Transaction(e.to_string())),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LmdbStoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key.as_bytes(), value.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), LmdbStoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))
    }
}

impl KeyValueStore for LmdbStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read(key)?)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.write(key, value)?)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        Ok(self.delete(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[test]
    fn test_put_and_get() {
        let (store, _dir) = create_test_store();
        store.set_item("dataCache", r#"{"a":1}"#).expect("set");
        assert_eq!(
            store.get_item("dataCache").expect("get"),
            Some(r#"{"a":1}"#.to_string())
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let (store, _dir) = create_test_store();
        assert_eq!(store.get_item("missing").expect("get"), None);
    }

    #[test]
    fn test_remove() {
        let (store, _dir) = create_test_store();
        store.set_item("k", "v").expect("set");
        store.remove_item("k").expect("remove");
        assert_eq!(store.get_item("k").expect("get"), None);
        store.remove_item("k").expect("removing twice is fine");
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let store = LmdbStore::new(temp_dir.path(), 10).expect("open");
            store.set_item("k", "persisted").expect("set");
        }
        let store = LmdbStore::new(temp_dir.path(), 10).expect("reopen");
        assert_eq!(
            store.get_item("k").expect("get"),
            Some("persisted".to_string())
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: StoreError = LmdbStoreError::DbOpen("boom".to_string()).into();
        assert!(matches!(err, StoreError::Backend { ref reason } if reason.contains("boom")));

        let full: StoreError =
            LmdbStoreError::Transaction("MDB_MAP_FULL: Environment mapsize limit reached".into())
                .into();
        assert!(matches!(full, StoreError::Unavailable { .. }));
    }
}
