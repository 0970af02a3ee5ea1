//! Cancellable sleeps used between run polls and retries.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ParleyError, Result};

/// Sleep for `duration` unless `cancel` fires first.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ParleyError::Canceled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
