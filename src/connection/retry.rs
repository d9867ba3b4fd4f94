// ABOUTME: Exponential backoff retry policy for backend acquisition and operations
// ABOUTME: Retries only connection and timeout failures within an attempt and time budget
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::BackendConfig;
use crate::constants::redis;
use crate::errors::{AppError, AppResult};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

/// Bounded exponential backoff
///
/// Attempt `n` (1-based) that fails with a retryable error is followed by a
/// delay of `base_delay * multiplier^(n-1)`, capped at `max_delay`. Retrying
/// stops after `max_attempts` attempts or once the next delay would overrun
/// `max_elapsed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
    /// Ceiling for any single delay
    pub max_delay: Duration,
    /// Total time budget across all attempts
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: redis::RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(redis::RETRY_BASE_DELAY_MS),
            multiplier: redis::RETRY_MULTIPLIER,
            max_delay: Duration::from_millis(redis::MAX_RETRY_DELAY_MS),
            max_elapsed: Duration::from_secs(redis::RETRY_MAX_ELAPSED_SECS),
        }
    }
}

impl RetryPolicy {
    /// Build the policy described by a backend configuration
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            multiplier: redis::RETRY_MULTIPLIER,
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
            max_elapsed: Duration::from_secs(config.retry_max_elapsed_secs),
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether a failure on attempt `attempt` should be retried
    #[must_use]
    pub fn should_retry(&self, attempt: u32, elapsed: Duration, error: &AppError) -> bool {
        error.is_retryable()
            && attempt < self.max_attempts
            && elapsed.saturating_add(self.delay_for_attempt(attempt)) <= self.max_elapsed
    }

    /// Run `f` until it succeeds, fails terminally, or the budget is spent
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last retryable one once
    /// attempts or time run out
    pub async fn retry<T, F, Fut>(&self, operation: &str, mut f: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Backend operation recovered after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    let will_retry = self.should_retry(attempt, started.elapsed(), &err);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        will_retry,
                        error = %err,
                        "Backend operation failed"
                    );
                    if !will_retry {
                        return Err(err);
                    }
                    sleep(self.delay_for_attempt(attempt)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            multiplier: 2,
            max_delay: Duration::from_millis(5),
            max_elapsed: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_default_delays_double_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(30));
    }

    #[test]
    fn test_validation_errors_are_never_retried() {
        let policy = RetryPolicy::default();
        let err = AppError::validation("bad shape");
        assert!(!policy.should_retry(1, Duration::ZERO, &err));
    }

    #[test]
    fn test_time_budget_stops_retrying() {
        let policy = RetryPolicy::default();
        let err = AppError::timeout("slow");
        assert!(policy.should_retry(1, Duration::ZERO, &err));
        assert!(!policy.should_retry(1, Duration::from_millis(29_500), &err));
        assert!(!policy.should_retry(3, Duration::ZERO, &err));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast_policy(3)
            .retry("test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::connection("refused"))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: AppResult<()> = fast_policy(3)
            .retry("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::connection("refused"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_terminal_error_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: AppResult<()> = fast_policy(3)
            .retry("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::storage("WRONGTYPE"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
