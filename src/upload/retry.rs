//! Retry logic with exponential backoff.
//!
//! Wraps any [`TransferExecutor`] so network faults and 5xx responses are
//! retried a bounded number of times. Client errors and malformed bodies
//! fail immediately.

use super::transfer::{ProgressFn, TransferExecutor};
use super::types::{Batch, BatchResult};
use crate::config::ClientConfig;
use crate::error::PhotoTrailsError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Retry strategy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryStrategy {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Base delay in seconds for exponential backoff
    pub base_delay_seconds: u64,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_seconds: 2,
        }
    }
}

impl RetryStrategy {
    pub fn new(max_retries: u32, base_delay_seconds: u64) -> Self {
        Self {
            max_retries,
            base_delay_seconds,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_retries, config.retry_base_delay_secs)
    }

    /// Whether attempt number `retry_count` (0-based) may be followed by another.
    pub fn should_retry(&self, retry_count: u32, error: &PhotoTrailsError) -> bool {
        error.is_retryable() && retry_count < self.max_retries
    }

    /// Exponential backoff: base_delay^(retry_count + 1) seconds
    pub fn calculate_backoff(&self, retry_count: u32) -> u64 {
        self.base_delay_seconds.saturating_pow(retry_count + 1)
    }
}

/// [`TransferExecutor`] decorator applying a [`RetryStrategy`].
pub struct RetryingTransfer<T> {
    inner: T,
    strategy: RetryStrategy,
}

impl<T> RetryingTransfer<T> {
    pub fn new(inner: T, strategy: RetryStrategy) -> Self {
        Self { inner, strategy }
    }
}

#[async_trait]
impl<T: TransferExecutor> TransferExecutor for RetryingTransfer<T> {
    async fn transfer(&self, batch: &Batch, on_progress: ProgressFn) -> Result<BatchResult, PhotoTrailsError> {
        let mut retry_count = 0;

        loop {
            match self.inner.transfer(batch, on_progress.clone()).await {
                Ok(result) => return Ok(result),
                Err(err) if self.strategy.should_retry(retry_count, &err) => {
                    let delay = self.strategy.calculate_backoff(retry_count);
                    warn!(
                        attempt = retry_count + 1,
                        delay_secs = delay,
                        error = %err,
                        "Batch transfer failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    retry_count += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
