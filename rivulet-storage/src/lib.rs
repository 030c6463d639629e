//! Rivulet Storage - Key-Value Stores and the Cache Table
//!
//! Defines the string-keyed store seam ([`KeyValueStore`]) that backs the TTL
//! cache operator, two backends for it, and the adapter that reads and writes
//! the whole cache table as a single JSON blob.
//!
//! # Accepted race
//!
//! [`CacheStore::set_entry`] reads the table, inserts one entry and writes the
//! table back with no lock held across the pair. Two writers racing on the
//! same table can lose an update; the last write wins.

pub mod adapter;
pub mod kv;
pub mod lmdb;
pub mod table;

pub use adapter::{probe, CacheStore, PROBE_KEY};
pub use kv::{KeyValueStore, MemoryStore};
pub use lmdb::{LmdbStore, LmdbStoreError};
pub use table::{CacheTable, CachedEntry};
