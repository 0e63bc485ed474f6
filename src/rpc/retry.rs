//! Retry logic with exponential backoff.
//!
//! Provides automatic retry for transient failures with configurable
//! backoff and jitter to prevent thundering herd. Used by [`crate::bridge::BridgeGateway`]
//! around its implicit re-registration path; the protocol does not mandate
//! backoff, so this is off by default (a single immediate retry).

use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Executor that handles retries with exponential backoff.
#[derive(Clone, Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry executor with default configuration.
    pub fn default_executor() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Create a retry executor that attempts an operation exactly once.
    pub fn no_retry() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        })
    }

    /// Execute an operation with retry logic.
    ///
    /// The operation is retried up to `max_retries` times on any `Err`.
    /// The protocol has no notion of "retryable" vs. "fatal" transport
    /// errors, so every failure is treated the same way.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempts = 0;
        let mut delay = self.config.initial_delay_ms;

        loop {
            attempts += 1;

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempts > self.config.max_retries {
                        return Err(e);
                    }

                    let jitter = self.jitter(delay);
                    let wait_time = delay + jitter;

                    tracing::debug!(attempts, delay_ms = wait_time, error = %e, "retrying after error");

                    sleep(Duration::from_millis(wait_time)).await;

                    delay = ((delay as f64) * self.config.backoff_multiplier) as u64;
                    delay = delay.min(self.config.max_delay_ms);
                }
            }
        }
    }

    /// Jitter for the given delay: 0-25% of delay, derived from the clock
    /// rather than pulling in a `rand` dependency for this single use.
    fn jitter(&self, delay: u64) -> u64 {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);

        let max_jitter = delay / 4;
        if max_jitter == 0 {
            0
        } else {
            (nanos as u64) % max_jitter
        }
    }

    /// Maximum number of retries configured.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_on_first_try() {
        let executor = RetryExecutor::default_executor();
        let result: Result<u32, &str> = executor.execute(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let executor = RetryExecutor::new(RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 10,
            backoff_multiplier: 2.0,
        });

        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = executor
            .execute(|| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("transient")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let executor = RetryExecutor::new(RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 10,
            backoff_multiplier: 2.0,
        });

        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn no_retry_attempts_exactly_once() {
        let executor = RetryExecutor::no_retry();
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
