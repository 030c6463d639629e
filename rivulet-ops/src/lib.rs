//! Rivulet Ops - Stream Operators
//!
//! Three independent operators over `futures::Stream<Item = Result<T, E>>`:
//!
//! - [`cache_locally`]: short-circuit a request with a fresh value from a
//!   persistent key-value store, or run it and store what it emits.
//! - [`RivuletStreamExt::distinct_until_keys_changed`]: drop values whose
//!   listed fields all equal those of the last emitted value.
//! - [`retry_until`]: resubscribe a failing source on a fixed interval until
//!   a condition stream emits a truthy value.
//!
//! # Stream model
//!
//! An `Err` item is a terminal failure; operators stop polling a source once
//! it has produced one. Dropping a stream is unsubscribing and releases
//! everything the subscription held. Operators that must start a source
//! again from scratch take a [`Subscribe`] instead of a stream.
//!
//! # Composition
//!
//! ```ignore
//! use rivulet_ops::prelude::*;
//!
//! let profile = (move || api.fetch_profile(42))
//!     .cache_locally("user:42", store, CacheLocallyConfig::default())
//!     .retry_until(shutdown_stream, RetryUntilConfig::default())
//!     .distinct_until_keys_changed(["name", "avatar"]);
//! ```

pub mod cache;
pub mod distinct;
pub mod retry;
pub mod source;

use std::fmt::Display;
use std::sync::Arc;

use futures::Stream;
use rivulet_storage::KeyValueStore;
use serde::Serialize;
use serde_json::Value;

pub use cache::{cache_locally, CacheLocally, CacheLocallyStream};
pub use distinct::{DistinctUntilChanged, FieldKeys, KeySelector};
pub use retry::retry_until;
pub use source::Subscribe;

// Re-export the types callers need to configure operators.
pub use rivulet_core::{
    CacheLocallyConfig, Clock, ManualClock, RetryUntilConfig, SystemClock, Truthy,
};

/// Filtering operators for any stream of `Result`s.
pub trait RivuletStreamExt: Stream {
    /// Suppress values whose `keys` fields all equal those of the last
    /// emitted value. The first value always passes; an empty key list
    /// passes only the first value.
    fn distinct_until_keys_changed<T, E, I, K>(
        self,
        keys: I,
    ) -> DistinctUntilChanged<Self, FieldKeys, Vec<Option<Value>>>
    where
        Self: Stream<Item = Result<T, E>> + Sized,
        T: Serialize,
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        DistinctUntilChanged::new(self, FieldKeys::new(keys))
    }

    /// Suppress values whose projection `key` equals that of the last
    /// emitted value.
    fn distinct_until_changed_by_key<T, E, F, K>(self, key: F) -> DistinctUntilChanged<Self, F, K>
    where
        Self: Stream<Item = Result<T, E>> + Sized,
        F: FnMut(&T) -> K,
        K: PartialEq,
    {
        DistinctUntilChanged::new(self, key)
    }
}

impl<S: Stream + ?Sized> RivuletStreamExt for S {}

/// Operators that need a resubscribable source.
pub trait SubscribeExt: Subscribe + Sized {
    /// See [`cache_locally`].
    fn cache_locally(
        self,
        key: impl Into<String>,
        backend: Arc<dyn KeyValueStore>,
        config: CacheLocallyConfig,
    ) -> CacheLocally<Self> {
        cache_locally(key, self, backend, config)
    }

    /// See [`retry_until`].
    fn retry_until<C, T, E>(
        self,
        condition: C,
        config: RetryUntilConfig,
    ) -> impl Stream<Item = Result<T, E>>
    where
        Self::Stream: Stream<Item = Result<T, E>>,
        C: Stream,
        C::Item: Truthy,
        E: Display,
    {
        retry_until(self, condition, config)
    }
}

impl<S: Subscribe> SubscribeExt for S {}

pub mod prelude {
    pub use crate::{
        cache_locally, retry_until, CacheLocallyConfig, RetryUntilConfig, RivuletStreamExt,
        Subscribe, SubscribeExt,
    };
}
