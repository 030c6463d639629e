//! Timing tests for the conditional retry operator, run on paused tokio time.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use rivulet_ops::prelude::*;
use rivulet_test_utils::ScriptedSource;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tokio_stream::wrappers::WatchStream;

fn every(ms: u64) -> RetryUntilConfig {
    RetryUntilConfig::new().with_delay(Duration::from_millis(ms))
}

/// Condition that fires `true` once after `ms`.
fn fire_after(ms: u64) -> impl futures::Stream<Item = bool> {
    stream::once(async move {
        sleep(Duration::from_millis(ms)).await;
        true
    })
}

#[tokio::test(start_paused = true)]
async fn test_n_failures_then_success() {
    for failures in 0..5usize {
        let script = ScriptedSource::fails_then(failures, "503".to_string(), vec![10, 20]);
        let started = Instant::now();

        let output: Vec<_> = script
            .source()
            .retry_until(stream::pending::<bool>(), every(250))
            .collect()
            .await;

        assert_eq!(output, vec![Ok(10), Ok(20)]);
        assert_eq!(script.calls(), failures + 1);

        let elapsed = started.elapsed();
        let expected = Duration::from_millis(250 * failures as u64);
        assert!(elapsed >= expected, "{failures} failures took {elapsed:?}");
        assert!(elapsed < expected + Duration::from_millis(50));
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_retry_completes_without_error() {
    let script = ScriptedSource::<u8, String>::always_fails("down".to_string());
    let started = Instant::now();

    let output: Vec<_> = retry_until(script.source(), fire_after(250), every(100))
        .collect()
        .await;

    assert!(output.is_empty());
    // Attempts at t=0, 100, 200; the stop at 250 cancels the wait for 300.
    assert_eq!(script.calls(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_millis(300));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_subscribed_cuts_emissions() {
    let source = || {
        stream::iter(0u32..).then(|n| async move {
            sleep(Duration::from_millis(100)).await;
            Ok::<u32, String>(n)
        })
    };

    let output: Vec<_> = retry_until(source, fire_after(250), every(1000))
        .collect()
        .await;

    assert_eq!(output, vec![Ok(0), Ok(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_falsy_condition_values_are_ignored() {
    let script = ScriptedSource::<u8, String>::always_fails("down".to_string());
    let condition = stream::iter(vec![0, 0, 0]).chain(fire_after(450).map(|_| 1));

    let output: Vec<_> = retry_until(script.source(), condition, every(100))
        .collect()
        .await;

    assert!(output.is_empty());
    assert_eq!(script.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_watch_channel_as_stop_signal() {
    let (stop_tx, stop_rx) = watch::channel(false);
    let script = ScriptedSource::<u8, String>::always_fails("down".to_string());

    let handle = tokio::spawn({
        let source = script.source();
        async move {
            retry_until(source, WatchStream::new(stop_rx), every(1000))
                .collect::<Vec<_>>()
                .await
        }
    });

    sleep(Duration::from_millis(3500)).await;
    stop_tx.send(true).expect("receiver alive");

    let output = handle.await.expect("retry task should not panic");
    assert!(output.is_empty());
    assert_eq!(script.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_output_stops_retrying() {
    let script = ScriptedSource::<u8, String>::always_fails("down".to_string());
    let mut output = Box::pin(retry_until(
        script.source(),
        stream::pending::<bool>(),
        every(100),
    ));

    // Keep polling for a while; nothing is ever emitted.
    let polled = tokio::time::timeout(Duration::from_millis(350), output.next()).await;
    assert!(polled.is_err());
    assert_eq!(script.calls(), 4);

    drop(output);
    sleep(Duration::from_secs(2)).await;
    assert_eq!(script.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_failed_subscription_is_released_during_delay() {
    let guard = std::sync::Arc::new(());
    let held = std::sync::Arc::clone(&guard);
    // Fails, then stays open while holding a clone of `guard`.
    let source = move || {
        let held = std::sync::Arc::clone(&held);
        stream::iter(vec![Err::<u8, String>("down".to_string())]).chain(stream::once(
            async move {
                let _held = held;
                futures::future::pending::<Result<u8, String>>().await
            },
        ))
    };

    let mut output = Box::pin(retry_until(source, stream::pending::<bool>(), every(1000)));
    let polled = tokio::time::timeout(Duration::from_millis(500), output.next()).await;
    assert!(polled.is_err());

    // Mid-delay only `guard` and the factory's copy remain.
    assert_eq!(std::sync::Arc::strong_count(&guard), 2);
}
