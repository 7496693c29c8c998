//! Retry and timeout helpers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use khoj_chat::error::KhojError;
use khoj_chat::util::{with_timeout, RetryPolicy};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_secs(1),
        multiplier: 2.0,
    }
}

#[tokio::test(start_paused = true)]
async fn retries_until_success() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let result = fast_policy(3)
        .execute(|| async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(KhojError::api(502, "bad gateway"))
            } else {
                Ok("ok")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_stops_immediately() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let result: Result<(), _> = fast_policy(5)
        .execute(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(KhojError::Authentication("bad key".into()))
        })
        .await;

    assert!(matches!(result, Err(KhojError::Authentication(_))));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_return_last_error() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let result: Result<(), _> = fast_policy(2)
        .execute(|| async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(KhojError::Stream(format!("reset {n}")))
        })
        .await;

    assert!(matches!(result, Err(KhojError::Stream(msg)) if msg == "reset 1"));
}

#[tokio::test]
async fn zero_attempts_is_invalid() {
    let result: Result<(), _> = fast_policy(0).execute(|| async { Ok(()) }).await;
    assert!(matches!(result, Err(KhojError::InvalidState(_))));
}

#[tokio::test(start_paused = true)]
async fn timeout_maps_to_timeout_error() {
    let result: Result<(), _> = with_timeout(Duration::from_millis(50), async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    })
    .await;

    assert!(matches!(result, Err(KhojError::Timeout(50))));
}
