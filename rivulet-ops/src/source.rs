//! Resubscribable stream sources.
//!
//! A Rust stream is consumed by polling it, so "subscribing again" means
//! building a fresh stream from its initial state. [`Subscribe`] is that
//! factory. Any `Fn() -> S` closure is a source, and so is
//! [`CacheLocally`](crate::CacheLocally), which lets cached requests be
//! wrapped by the retry operator.

use futures::Stream;

/// A cold source that can be subscribed to any number of times.
pub trait Subscribe {
    type Stream: Stream;

    /// Start a new, independent subscription.
    fn subscribe(&self) -> Self::Stream;
}

impl<F, S> Subscribe for F
where
    F: Fn() -> S,
    S: Stream,
{
    type Stream = S;

    fn subscribe(&self) -> S {
        self()
    }
}
