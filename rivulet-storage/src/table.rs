//! Cache table and cached entry types.
//!
//! On disk the table is one JSON object keyed by cache key:
//!
//! ```text
//! { "user:42": { "key": "user:42", "cachedAt": "2024-05-01T10:00:00Z", "value": {...} } }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use rivulet_core::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One cached value with the instant it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry<T> {
    pub key: String,
    pub cached_at: Timestamp,
    pub value: T,
}

impl<T> CachedEntry<T> {
    pub fn new(key: impl Into<String>, cached_at: Timestamp, value: T) -> Self {
        Self {
            key: key.into(),
            cached_at,
            value,
        }
    }

    /// Instant after which the entry is no longer fresh.
    ///
    /// Saturates at the latest representable instant for huge TTLs.
    pub fn expires_at(&self, ttl: Duration) -> Timestamp {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.cached_at.checked_add_signed(ttl))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }

    /// Strict freshness check: the expiry instant itself is already stale.
    pub fn is_fresh(&self, ttl: Duration, now: Timestamp) -> bool {
        self.expires_at(ttl) > now
    }

    /// Consume the entry and return the cached value.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Whole cache table: cache key to raw JSON entry.
///
/// Entries stay untyped until read, so entries of different value types can
/// share one table and a malformed entry only affects its own key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheTable {
    entries: BTreeMap<String, Value>,
}

impl CacheTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw JSON stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Entry for `key` decoded as `T`. An entry that does not decode, whether
    /// from a wrong value type or a malformed envelope, counts as absent.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<CachedEntry<T>> {
        let raw = self.entries.get(key)?;
        match CachedEntry::<T>::deserialize(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(key, error = %e, "Cached entry does not decode, treating as absent");
                None
            }
        }
    }

    /// Insert or overwrite the entry under its key. Other entries, decodable
    /// or not, are kept as they are.
    pub fn insert<T: Serialize>(&mut self, entry: &CachedEntry<T>) -> Result<(), serde_json::Error> {
        let raw = serde_json::to_value(entry)?;
        self.entries.insert(entry.key.clone(), raw);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
