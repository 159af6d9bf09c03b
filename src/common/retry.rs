//! Retry with exponential backoff, and 429 handling
//!
//! Two layers wrap every API call. The inner layer answers HTTP 429 by
//! waiting for the server's `retry-after` hint and re-issuing the request,
//! a bounded number of times. The outer layer retries transient failures
//! (5xx, network errors, malformed responses) with pure exponential backoff.
//! Client errors in the non-retryable set surface on the first attempt.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Backoff policy for transient failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before attempt `n` is `base_delay * 2^(n-1)`
    pub base_delay: Duration,
    /// Statuses that are never retried
    pub non_retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            non_retryable_statuses: vec![401, 403, 404],
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_non_retryable_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.non_retryable_statuses = statuses;
        self
    }

    /// Delay before attempt `attempt` (1-based). The first attempt is immediate.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether `error` is worth another attempt under this policy
    pub fn should_retry(&self, error: &Error) -> bool {
        match error {
            // never sent / handled by the 429 layer / already wrapped
            Error::Validation(_)
            | Error::RateLimited { .. }
            | Error::RetriesExhausted { .. }
            | Error::Config(_)
            | Error::PollCancelled
            | Error::PollExhausted { .. } => false,
            other => other
                .status()
                .map_or(true, |status| !self.non_retryable_statuses.contains(&status)),
        }
    }
}

/// How to react to HTTP 429
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Re-issues per call before the 429 is returned to the caller
    pub max_retries: u32,
    /// Wait used when the server sends no `retry-after`
    pub default_retry_after: Duration,
    /// Upper bound of the random delay added to each wait
    pub max_jitter: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            default_retry_after: Duration::from_secs(5),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RateLimitPolicy {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_default_retry_after(mut self, wait: Duration) -> Self {
        self.default_retry_after = wait;
        self
    }

    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Server hint (or the default) plus jitter
    pub fn wait_for(&self, error: &Error) -> Duration {
        error.retry_after().unwrap_or(self.default_retry_after) + jitter(self.max_jitter)
    }
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// Returns the first success, the first non-retryable error unchanged, or
/// [`Error::RetriesExhausted`] carrying the attempt count and last error.
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !policy.should_retry(&e) => return Err(e),
            Err(e) if attempt >= max_attempts => {
                tracing::warn!(attempts = attempt, error = %e, "Giving up after retries");
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                attempt += 1;
                let delay = policy.delay_before(attempt);
                tracing::warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                    attempt - 1,
                    max_attempts,
                    e,
                    delay.as_millis()
                );
                sleep(delay).await;
            }
        }
    }
}

/// Run `operation`, waiting out HTTP 429 responses up to `policy.max_retries` times.
///
/// Once the cap is reached the last 429 is returned inside
/// [`Error::RetriesExhausted`]; its `kind()` and `status()` still report the
/// rate limit.
pub async fn with_rate_limit_retry<F, Fut, T>(policy: &RateLimitPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Err(e) if e.is_rate_limited() && retries < policy.max_retries => {
                retries += 1;
                let wait = policy.wait_for(&e);
                tracing::warn!(
                    "Rate limited ({}/{}), retrying in {}ms",
                    retries,
                    policy.max_retries,
                    wait.as_millis()
                );
                sleep(wait).await;
            }
            Err(e) if e.is_rate_limited() => {
                tracing::warn!("Rate limited {} times, giving up", retries + 1);
                return Err(Error::RetriesExhausted {
                    attempts: retries + 1,
                    source: Box::new(e),
                });
            }
            other => return other,
        }
    }
}
