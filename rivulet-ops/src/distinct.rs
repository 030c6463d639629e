//! Equality filters over successive stream values.
//!
//! [`DistinctUntilChanged`] keeps a projection of the last value it let
//! through and drops every following value whose projection is equal to it.
//! Suppressed values never replace the retained projection, so comparison is
//! always against the last *emitted* value. `Err` items pass straight through
//! and leave the state alone.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use serde::Serialize;
use serde_json::Value;

/// Projects a value onto the part used for equality.
pub trait KeySelector<T> {
    type Key: PartialEq;

    fn select(&mut self, value: &T) -> Self::Key;
}

impl<T, K, F> KeySelector<T> for F
where
    F: FnMut(&T) -> K,
    K: PartialEq,
{
    type Key = K;

    fn select(&mut self, value: &T) -> K {
        self(value)
    }
}

/// Selects a fixed list of named fields from a value's JSON form.
///
/// A field missing from the value, or any field of a value that is not a
/// JSON object, selects as `None`. `None` equals `None` and nothing else, so
/// an absent field never matches a present `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKeys {
    keys: Vec<String>,
}

impl FieldKeys {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl<T: Serialize> KeySelector<T> for FieldKeys {
    type Key = Vec<Option<Value>>;

    fn select(&mut self, value: &T) -> Self::Key {
        let object = match serde_json::to_value(value) {
            Ok(Value::Object(object)) => Some(object),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Value is not serializable, comparing as absent");
                None
            }
        };

        self.keys
            .iter()
            .map(|key| object.as_ref().and_then(|o| o.get(key)).cloned())
            .collect()
    }
}

pin_project! {
    /// Stream for [`distinct_until_changed_by_key`](crate::RivuletStreamExt::distinct_until_changed_by_key)
    /// and [`distinct_until_keys_changed`](crate::RivuletStreamExt::distinct_until_keys_changed).
    #[must_use = "streams do nothing unless polled"]
    pub struct DistinctUntilChanged<S, Sel, K> {
        #[pin]
        stream: S,
        selector: Sel,
        previous: Option<K>,
    }
}

impl<S, Sel, K> DistinctUntilChanged<S, Sel, K> {
    pub fn new(stream: S, selector: Sel) -> Self {
        Self {
            stream,
            selector,
            previous: None,
        }
    }
}

impl<S, Sel, K, T, E> Stream for DistinctUntilChanged<S, Sel, K>
where
    S: Stream<Item = Result<T, E>>,
    Sel: KeySelector<T, Key = K>,
    K: PartialEq,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(value)) => {
                    let key = this.selector.select(&value);
                    if this.previous.as_ref() == Some(&key) {
                        continue;
                    }
                    *this.previous = Some(key);
                    return Poll::Ready(Some(Ok(value)));
                }
                other => return Poll::Ready(other),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.stream.size_hint();
        (0, upper)
    }
}
