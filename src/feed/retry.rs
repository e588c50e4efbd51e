//! Fixed-backoff wait for the host feed container.
//!
//! The host view may not exist yet when the runner starts (page still
//! loading, navigation in progress). Readiness is polled at a fixed delay
//! for a bounded number of attempts.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RetryConfig;
use crate::{AppError, Result};

/// Bounded fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub delay: Duration,
    /// Total number of checks, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_attempts: 30,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.delay_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl RetryPolicy {
    /// Probe until `ready` returns `true`.
    ///
    /// Returns `Ok(true)` once ready, or `Ok(false)` if `cancel` fires first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Feed` when every attempt fails.
    pub async fn wait_until<F>(&self, cancel: &CancellationToken, mut ready: F) -> Result<bool>
    where
        F: FnMut() -> bool,
    {
        for attempt in 1..=self.max_attempts {
            if ready() {
                return Ok(true);
            }
            if attempt == self.max_attempts {
                break;
            }
            debug!(attempt, "feed container not ready, retrying");
            tokio::select! {
                () = cancel.cancelled() => return Ok(false),
                () = tokio::time::sleep(self.delay) => {}
            }
        }
        Err(AppError::Feed(format!(
            "feed container not ready after {} attempts",
            self.max_attempts
        )))
    }
}
