//! TTL cache operator backed by a persistent key-value store.
//!
//! [`cache_locally`] wraps a request source. On each subscription it checks
//! the store for a fresh value under `key`:
//!
//! - **Hit**: emit the stored value once and complete. The request is never
//!   subscribed.
//! - **Miss** (absent, stale, undecodable, or store unavailable): subscribe to
//!   the request, forward every item unchanged and write each successful
//!   value to the store with the current timestamp.
//!
//! Freshness is strict: an entry written at `t` with TTL `ttl` is stale from
//! `t + ttl` onwards.
//!
//! # Example
//!
//! ```ignore
//! let store: Arc<dyn KeyValueStore> = Arc::new(LmdbStore::new("/var/cache/app", 10)?);
//! let profile = cache_locally(
//!     "user:42",
//!     move || client.fetch_profile(42),
//!     store,
//!     CacheLocallyConfig::new().with_ttl(Duration::from_secs(60)),
//! );
//!
//! let value = profile.subscribe().next().await;
//! ```

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use futures::Stream;
use rivulet_core::{CacheLocallyConfig, Clock, SystemClock};
use rivulet_storage::{CacheStore, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::source::Subscribe;

/// Wrap `request` with a TTL cache stored in `backend`.
pub fn cache_locally<R>(
    key: impl Into<String>,
    request: R,
    backend: Arc<dyn KeyValueStore>,
    config: CacheLocallyConfig,
) -> CacheLocally<R> {
    CacheLocally {
        key: key.into(),
        request: Arc::new(request),
        backend,
        config,
        clock: Arc::new(SystemClock),
    }
}

/// A cache-backed request source. See [`cache_locally`].
pub struct CacheLocally<R> {
    key: String,
    request: Arc<R>,
    backend: Arc<dyn KeyValueStore>,
    config: CacheLocallyConfig,
    clock: Arc<dyn Clock>,
}

impl<R> CacheLocally<R> {
    /// Use `clock` instead of the system clock for freshness checks and
    /// write timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &CacheLocallyConfig {
        &self.config
    }
}

impl<R> Clone for CacheLocally<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            request: Arc::clone(&self.request),
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, T, E> Subscribe for CacheLocally<R>
where
    R: Subscribe,
    R::Stream: Stream<Item = Result<T, E>>,
    T: Serialize + DeserializeOwned,
{
    type Stream = CacheLocallyStream<R, T>;

    fn subscribe(&self) -> Self::Stream {
        CacheLocallyStream {
            source: self.clone(),
            state: State::Pending,
            _value: PhantomData,
        }
    }
}

enum State<S> {
    /// Not polled yet; the hit/miss decision happens on first poll.
    Pending,
    Miss {
        store: CacheStore,
        request: Pin<Box<S>>,
    },
    Done,
}

/// One subscription to a [`CacheLocally`] source.
pub struct CacheLocallyStream<R: Subscribe, T> {
    source: CacheLocally<R>,
    state: State<R::Stream>,
    _value: PhantomData<fn() -> T>,
}

// The request stream is boxed and the value type is only phantom.
impl<R: Subscribe, T> Unpin for CacheLocallyStream<R, T> {}

impl<R, T, E> Stream for CacheLocallyStream<R, T>
where
    R: Subscribe,
    R::Stream: Stream<Item = Result<T, E>>,
    T: Serialize + DeserializeOwned,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match &mut this.state {
                State::Pending => {
                    let source = &this.source;
                    let store =
                        CacheStore::resolve(Arc::clone(&source.backend), &source.config.table_key);
                    let now = source.clock.now();

                    if let Some(entry) = store
                        .entry::<T>(&source.key)
                        .filter(|entry| entry.is_fresh(source.config.ttl, now))
                    {
                        tracing::debug!(
                            key = %source.key,
                            cached_at = %entry.cached_at,
                            "Cache hit, skipping request"
                        );
                        this.state = State::Done;
                        return Poll::Ready(Some(Ok(entry.into_value())));
                    }

                    tracing::debug!(
                        key = %source.key,
                        store_available = store.is_available(),
                        "Cache miss, subscribing to request"
                    );
                    let request = Box::pin(source.request.subscribe());
                    this.state = State::Miss { store, request };
                }
                State::Miss { store, request } => {
                    match ready!(request.as_mut().poll_next(cx)) {
                        Some(Ok(value)) => {
                            store.set_entry(&this.source.key, &value, this.source.clock.now());
                            return Poll::Ready(Some(Ok(value)));
                        }
                        Some(Err(e)) => {
                            this.state = State::Done;
                            return Poll::Ready(Some(Err(e)));
                        }
                        None => {
                            this.state = State::Done;
                            return Poll::Ready(None);
                        }
                    }
                }
                State::Done => return Poll::Ready(None),
            }
        }
    }
}
