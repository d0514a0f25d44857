//! Retry with exponential backoff and full jitter.
//!
//! The indexer wraps every per-chunk embedding call in
//! [`RetryConfig::retry_if`], with the embedding model's own
//! [`is_retryable`](quill_core::embedding::EmbeddingModel::is_retryable)
//! predicate deciding which failures are worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Configuration for retry behavior on failed operations.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first (at least 1).
    pub max_attempts: u32,
    /// Backoff ceiling before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single backoff.
    pub max_backoff: Duration,
    /// Growth factor applied per retry.
    pub backoff_multiplier: f64,
    /// Sleep a uniformly random duration in `[0, ceiling]` instead of the ceiling.
    pub full_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 1.5,
            full_jitter: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            full_jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Backoff ceiling before retry number `retry` (0-based).
    pub fn backoff_ceiling(&self, retry: u32) -> Duration {
        let millis =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(retry as i32);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }

    fn delay(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_ceiling(retry);
        if !self.full_jitter || ceiling.is_zero() {
            return ceiling;
        }
        let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Run `operation` until it succeeds, fails with an error
    /// `should_retry` rejects, or attempts run out. The last error is
    /// returned.
    pub async fn retry_if<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        mut should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !should_retry(&err) {
                        tracing::debug!(error = %err, "Non-retryable error, failing immediately");
                        return Err(err);
                    }
                    if attempt >= attempts {
                        tracing::warn!(error = %err, attempts, "Retry attempts exhausted");
                        return Err(err);
                    }
                    let backoff = self.delay(attempt - 1);
                    tracing::debug!(
                        error = %err,
                        attempt,
                        max_attempts = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying operation after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
