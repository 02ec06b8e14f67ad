//! Opt-in retry for transient upstream failures.
//!
//! Only network errors and 5xx responses are retried (see
//! [`ResolveError::is_transient`]). Auth rejections have their own
//! single-retry path in [`crate::credential::with_credential`]; not-found and
//! no-variant outcomes are final.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::SoundCloudConfig;
use crate::error::Result;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial attempt).
    pub max_retries: u32,
    /// Fixed pause before each retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        backoff: Duration::ZERO,
    };

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &SoundCloudConfig) -> Self {
        Self::new(
            config.transient_retries,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Run `operation`, retrying transient failures up to `max_retries` times.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max = self.max_retries,
                        delay_ms = u64::try_from(self.backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                other => return other,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}
