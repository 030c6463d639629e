//! Retry a failing source on a fixed interval until a stop signal arrives.
//!
//! The operator runs two logical tasks in one stream: the retry loop
//! (subscribe, forward, on failure wait `delay` and resubscribe) and a
//! watcher on the condition stream. They are joined with `tokio::select!`;
//! the first truthy condition value ends the output stream normally and
//! drops whatever the loop was doing, whether that was an in-flight
//! subscription or a pending delay.
//!
//! ```text
//! Subscribed --Err--> AwaitingRetry --delay--> Subscribed
//!     |  \--None (success)--> done
//!     \------ condition truthy (any state) ------> Stopped (done)
//! ```
//!
//! Failures are never surfaced. With no truthy condition and a source that
//! never succeeds, the loop runs forever.

use std::fmt::Display;

use async_stream::stream;
use futures::{Stream, StreamExt};
use rivulet_core::{RetryUntilConfig, Truthy};

use crate::source::Subscribe;

enum Step<T> {
    Stop,
    Item(Option<T>),
}

/// Resolves on the first truthy value of `condition`; never resolves if the
/// condition ends without one.
async fn stop_signal<C>(condition: C)
where
    C: Stream,
    C::Item: Truthy,
{
    futures::pin_mut!(condition);
    while let Some(value) = condition.next().await {
        if value.is_truthy() {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Subscribe to `source`, resubscribing `config.delay` after every failure,
/// until `condition` emits a truthy value or the source completes.
pub fn retry_until<Src, C, T, E>(
    source: Src,
    condition: C,
    config: RetryUntilConfig,
) -> impl Stream<Item = Result<T, E>>
where
    Src: Subscribe,
    Src::Stream: Stream<Item = Result<T, E>>,
    C: Stream,
    C::Item: Truthy,
    E: Display,
{
    stream! {
        let stop = stop_signal(condition);
        futures::pin_mut!(stop);
        let mut attempt: u64 = 0;

        'retry: loop {
            // The subscription is dropped before waiting out the delay.
            {
                let request = source.subscribe();
                futures::pin_mut!(request);

                loop {
                    let step = tokio::select! {
                        biased;
                        () = &mut stop => Step::Stop,
                        item = request.next() => Step::Item(item),
                    };

                    match step {
                        Step::Stop => {
                            tracing::debug!(attempt, "Retry condition met, stopping");
                            break 'retry;
                        }
                        Step::Item(Some(Ok(value))) => {
                            yield Ok(value);
                        }
                        Step::Item(Some(Err(e))) => {
                            attempt += 1;
                            tracing::warn!(
                                attempt,
                                delay_ms = config.delay.as_millis() as u64,
                                error = %e,
                                "Source failed, scheduling retry"
                            );
                            break;
                        }
                        Step::Item(None) => break 'retry,
                    }
                }
            }

            let resumed = tokio::select! {
                biased;
                () = &mut stop => false,
                () = tokio::time::sleep(config.delay) => true,
            };
            if !resumed {
                tracing::debug!(attempt, "Retry condition met while waiting, stopping");
                break 'retry;
            }
        }
    }
}
