//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::KhojError;

/// Retry policy for idempotent request/response calls. Streaming chat
/// requests are never retried: a partial response has already been shown.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or attempts run out. The last error is returned.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, KhojError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, KhojError>>,
    {
        if self.max_attempts == 0 {
            return Err(KhojError::InvalidState(
                "retry policy allows no attempts".into(),
            ));
        }

        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err);
            }

            let delay = self.delay(&err, backoff);
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after error"
            );
            tokio::time::sleep(delay).await;

            backoff = backoff.mul_f64(self.multiplier).min(self.max_backoff);
            attempt += 1;
        }
    }

    /// Server-provided `retry_after` wins (capped at `max_backoff`);
    /// otherwise the backoff with 75%–125% jitter.
    fn delay(&self, err: &KhojError, backoff: Duration) -> Duration {
        if let KhojError::RateLimited {
            retry_after_ms: Some(ms),
        } = err
        {
            return Duration::from_millis(*ms).min(self.max_backoff);
        }
        backoff.mul_f64(0.75 + jitter() * 0.5)
    }
}

/// Pseudo-random factor in [0, 1) from the clock and thread id.
fn jitter() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);
    (hasher.finish() % 10_000) as f64 / 10_000.0
}
