//! Rivulet Test Utilities
//!
//! Shared test infrastructure for the Rivulet workspace:
//! - Fixtures (`Profile`, fixed instants)
//! - Request sources that count subscriptions or follow a failure script
//! - A key-value store whose availability can be switched at runtime
//! - Proptest generators

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::vec;

use chrono::{TimeZone, Utc};
use futures::stream::{self, Iter};
use serde::{Deserialize, Serialize};

pub use rivulet_core::{ManualClock, StoreError, Timestamp};
pub use rivulet_storage::{CacheStore, KeyValueStore, MemoryStore};

/// Stream type produced by every source in this crate.
pub type ItemStream<T, E> = Iter<vec::IntoIter<Result<T, E>>>;

// ============================================================================
// FIXTURES
// ============================================================================

/// A small JSON-object value type for cache and filter tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub name: String,
    pub email: Option<String>,
}

impl Profile {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Fixed reference instant (2024-01-01T00:00:00Z) for clock-driven tests.
pub fn fixed_instant() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A manual clock starting at [`fixed_instant`].
pub fn fixed_clock() -> ManualClock {
    ManualClock::new(fixed_instant())
}

// ============================================================================
// SOURCES
// ============================================================================

/// Request that replays the same items on every subscription and counts
/// how many times it was subscribed.
#[derive(Debug, Clone)]
pub struct CountingRequest<T, E> {
    items: Arc<Vec<Result<T, E>>>,
    calls: Arc<AtomicUsize>,
}

impl<T: Clone, E: Clone> CountingRequest<T, E> {
    pub fn new(items: Vec<Result<T, E>>) -> Self {
        Self {
            items: Arc::new(items),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Request emitting one value and completing.
    pub fn ok(value: T) -> Self {
        Self::new(vec![Ok(value)])
    }

    /// Request that emits nothing and completes.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of subscriptions so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A `Fn() -> Stream` source sharing this request's counter.
    pub fn source(&self) -> impl Fn() -> ItemStream<T, E> + Clone {
        let items = Arc::clone(&self.items);
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            stream::iter(items.as_ref().clone())
        }
    }
}

/// Source whose n-th subscription replays the n-th scripted attempt.
///
/// Subscriptions past the end of the script repeat the last attempt.
#[derive(Debug, Clone)]
pub struct ScriptedSource<T, E> {
    attempts: Arc<Vec<Vec<Result<T, E>>>>,
    calls: Arc<AtomicUsize>,
}

impl<T: Clone, E: Clone> ScriptedSource<T, E> {
    pub fn new(attempts: Vec<Vec<Result<T, E>>>) -> Self {
        Self {
            attempts: Arc::new(attempts),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail `failures` times with `error`, then emit `values` and complete.
    pub fn fails_then(failures: usize, error: E, values: Vec<T>) -> Self {
        let mut attempts: Vec<Vec<Result<T, E>>> = vec![vec![Err(error)]; failures];
        attempts.push(values.into_iter().map(Ok).collect());
        Self::new(attempts)
    }

    /// Fail with `error` on every subscription.
    pub fn always_fails(error: E) -> Self {
        Self::new(vec![vec![Err(error)]])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn source(&self) -> impl Fn() -> ItemStream<T, E> + Clone {
        let attempts = Arc::clone(&self.attempts);
        let calls = Arc::clone(&self.calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let attempt = attempts
                .get(n)
                .or_else(|| attempts.last())
                .cloned()
                .unwrap_or_default();
            stream::iter(attempt)
        }
    }
}

// ============================================================================
// STORES
// ============================================================================

/// In-memory store that can be switched off, and counts writes per key.
#[derive(Debug, Default)]
pub struct SwitchableStore {
    inner: MemoryStore,
    unavailable: AtomicBool,
    writes: RwLock<HashMap<String, usize>>,
}

impl SwitchableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Successful `set_item` calls for `key`.
    pub fn writes(&self, key: &str) -> usize {
        self.writes
            .read()
            .ok()
            .and_then(|w| w.get(key).copied())
            .unwrap_or(0)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                reason: "switched off".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for SwitchableStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_item(key, value)?;
        if let Ok(mut writes) = self.writes.write() {
            *writes.entry(key.to_string()).or_default() += 1;
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.remove_item(key)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Rivulet test inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a cache key like `user:17`.
    pub fn arb_cache_key() -> impl Strategy<Value = String> {
        "[a-z]{1,8}:[0-9]{1,4}"
    }

    /// Generate a TTL in milliseconds between 1ms and 1 hour.
    pub fn arb_ttl_ms() -> impl Strategy<Value = u64> {
        1u64..3_600_000u64
    }

    /// Generate a profile from a deliberately small domain, so sequences
    /// contain runs of equal fields.
    pub fn arb_profile() -> impl Strategy<Value = Profile> {
        (
            0u64..3,
            prop::sample::select(vec!["ada", "bo", "cy"]),
            prop::option::of(prop::sample::select(vec!["a@x.io", "b@x.io"])),
        )
            .prop_map(|(id, name, email)| Profile {
                id,
                name: name.to_string(),
                email: email.map(str::to_string),
            })
    }

    /// Generate a sequence of profiles.
    pub fn arb_profile_sequence(max_len: usize) -> impl Strategy<Value = Vec<Profile>> {
        prop::collection::vec(arb_profile(), 0..max_len)
    }

    /// Generate an ordered subset of `Profile` field names, possibly empty,
    /// possibly naming a field that does not exist.
    pub fn arb_profile_keys() -> impl Strategy<Value = Vec<String>> {
        prop::sample::subsequence(vec!["id", "name", "email", "missing"], 0..=4)
            .prop_map(|keys| keys.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::StreamExt;

    #[test]
    fn test_counting_request_counts() {
        let request = CountingRequest::<i32, String>::ok(5);
        let source = request.source();

        let items: Vec<_> = block_on(source().collect());
        let _ = source();

        assert_eq!(items, vec![Ok(5)]);
        assert_eq!(request.calls(), 2);
    }

    #[test]
    fn test_scripted_source_follows_script() {
        let script = ScriptedSource::fails_then(2, "down".to_string(), vec![1, 2]);
        let source = script.source();

        let attempts: Vec<Vec<Result<i32, String>>> =
            (0..4).map(|_| block_on(source().collect())).collect();

        assert_eq!(attempts[0], vec![Err("down".to_string())]);
        assert_eq!(attempts[1], vec![Err("down".to_string())]);
        assert_eq!(attempts[2], vec![Ok(1), Ok(2)]);
        assert_eq!(attempts[3], vec![Ok(1), Ok(2)]);
        assert_eq!(script.calls(), 4);
    }

    #[test]
    fn test_switchable_store() {
        let store = SwitchableStore::new();
        store.set_item("k", "v").expect("available by default");
        assert_eq!(store.writes("k"), 1);

        store.set_available(false);
        assert!(store.get_item("k").is_err());
        assert!(store.set_item("k", "w").is_err());
        assert_eq!(store.writes("k"), 1);

        store.set_available(true);
        assert_eq!(store.get_item("k").expect("get"), Some("v".to_string()));
    }

    #[test]
    fn test_fixed_clock_starts_at_fixed_instant() {
        assert_eq!(rivulet_core::Clock::now(&fixed_clock()), fixed_instant());
    }
}
