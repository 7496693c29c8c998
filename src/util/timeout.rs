//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::KhojError;

/// Bound `future` by `duration`, mapping expiry to [`KhojError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, KhojError>>,
) -> Result<T, KhojError> {
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or_else(|_| Err(KhojError::Timeout(duration.as_millis() as u64)))
}
