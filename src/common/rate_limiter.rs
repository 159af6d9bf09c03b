//! Local request budget per API key and rate-limit tier
//!
//! The orders API enforces hourly quotas per key (1000/h general, 100/h for
//! order creation, 50/h for confirmations and payment-identifier requests).
//! This limiter mirrors those quotas in-process so a busy caller waits
//! locally instead of collecting 429s. Windows are fixed and keyed by the
//! API key fingerprint, never by the raw key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Documented rate-limit buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    General,
    OrderCreation,
    Confirmation,
    PaymentIdentifiers,
}

impl RateLimitTier {
    pub const ALL: [RateLimitTier; 4] = [
        RateLimitTier::General,
        RateLimitTier::OrderCreation,
        RateLimitTier::Confirmation,
        RateLimitTier::PaymentIdentifiers,
    ];

    /// Requests per window as documented by the service
    pub fn documented_limit(self) -> u32 {
        match self {
            RateLimitTier::General => 1000,
            RateLimitTier::OrderCreation => 100,
            RateLimitTier::Confirmation => 50,
            RateLimitTier::PaymentIdentifiers => 50,
        }
    }
}

impl std::fmt::Display for RateLimitTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitTier::General => write!(f, "general"),
            RateLimitTier::OrderCreation => write!(f, "order_creation"),
            RateLimitTier::Confirmation => write!(f, "confirmation"),
            RateLimitTier::PaymentIdentifiers => write!(f, "payment_identifiers"),
        }
    }
}

/// Configuration for the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Length of one quota window
    pub window: Duration,
    /// Requests allowed per window, per tier
    pub limits: HashMap<RateLimitTier, u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(3600),
            limits: RateLimitTier::ALL
                .into_iter()
                .map(|tier| (tier, tier.documented_limit()))
                .collect(),
        }
    }
}

impl RateLimiterConfig {
    /// Override the quota for one tier; at least one request per window
    pub fn with_limit(mut self, tier: RateLimitTier, requests: u32) -> Self {
        self.limits.insert(tier, requests.max(1));
        self
    }

    /// Override the window length
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Quota for `tier`; a zero entry in `limits` counts as one
    pub fn limit(&self, tier: RateLimitTier) -> u32 {
        self.limits
            .get(&tier)
            .copied()
            .unwrap_or_else(|| tier.documented_limit())
            .max(1)
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

type BucketKey = (String, RateLimitTier);

/// Fixed-window request counter shared by every clone
///
/// # Example
///
/// ```
/// use sdigital_orders::common::{RateLimiter, RateLimiterConfig, RateLimitTier};
///
/// #[tokio::main]
/// async fn main() {
///     let limiter = RateLimiter::new(RateLimiterConfig::default());
///
///     // Acquire before each request
///     limiter.acquire_request("key-fingerprint", RateLimitTier::OrderCreation).await;
///     assert_eq!(limiter.remaining("key-fingerprint", RateLimitTier::OrderCreation).await, 99);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: Arc<RateLimiterConfig>,
    windows: Arc<Mutex<HashMap<BucketKey, Window>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config: Arc::new(config),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Documented tiers, one-hour windows
    pub fn with_defaults() -> Self {
        Self::new(RateLimiterConfig::default())
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Take one request from a bucket, or report how long until it refills
    async fn take(&self, key_id: &str, tier: RateLimitTier) -> Result<(), Duration> {
        let limit = self.config.limit(tier);
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry((key_id.to_string(), tier))
            .or_insert_with(|| Window {
                started: Instant::now(),
                used: 0,
            });

        let elapsed = window.started.elapsed();
        if elapsed >= self.config.window {
            window.started = Instant::now();
            window.used = 0;
        }

        if window.used < limit {
            window.used += 1;
            Ok(())
        } else {
            Err(self.config.window.saturating_sub(window.started.elapsed()))
        }
    }

    /// Try to take one request without waiting
    pub async fn try_acquire(&self, key_id: &str, tier: RateLimitTier) -> bool {
        self.take(key_id, tier).await.is_ok()
    }

    /// Wait until the bucket has room, then take one request
    pub async fn acquire(&self, key_id: &str, tier: RateLimitTier) {
        loop {
            match self.take(key_id, tier).await {
                Ok(()) => return,
                Err(wait) => {
                    tracing::warn!(
                        tier = %tier,
                        wait_ms = wait.as_millis() as u64,
                        "Local rate limit reached, waiting for next window"
                    );
                    // never spin on a zero wait
                    sleep(wait.max(Duration::from_millis(1))).await;
                }
            }
        }
    }

    /// Acquire for a request: its own tier, plus the general tier
    pub async fn acquire_request(&self, key_id: &str, tier: RateLimitTier) {
        self.acquire(key_id, tier).await;
        if tier != RateLimitTier::General {
            self.acquire(key_id, RateLimitTier::General).await;
        }
    }

    /// Requests left in the current window
    pub async fn remaining(&self, key_id: &str, tier: RateLimitTier) -> u32 {
        let limit = self.config.limit(tier);
        let windows = self.windows.lock().await;
        match windows.get(&(key_id.to_string(), tier)) {
            Some(window) if window.started.elapsed() < self.config.window => {
                limit.saturating_sub(window.used)
            }
            _ => limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.window, Duration::from_secs(3600));
        assert_eq!(config.limit(RateLimitTier::General), 1000);
        assert_eq!(config.limit(RateLimitTier::OrderCreation), 100);
        assert_eq!(config.limit(RateLimitTier::Confirmation), 50);
        assert_eq!(config.limit(RateLimitTier::PaymentIdentifiers), 50);
    }

    #[test]
    fn test_config_builder() {
        let config = RateLimiterConfig::default()
            .with_limit(RateLimitTier::Confirmation, 2)
            .with_window(Duration::from_millis(500));

        assert_eq!(config.limit(RateLimitTier::Confirmation), 2);
        assert_eq!(config.window, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_still_admits_one_per_window() {
        let mut config = RateLimiterConfig::default()
            .with_limit(RateLimitTier::OrderCreation, 0)
            .with_window(Duration::from_secs(60));
        assert_eq!(config.limit(RateLimitTier::OrderCreation), 1);

        config.limits.insert(RateLimitTier::Confirmation, 0);
        assert_eq!(config.limit(RateLimitTier::Confirmation), 1);

        let limiter = RateLimiter::new(config);
        let start = Instant::now();
        limiter.acquire("k1", RateLimitTier::Confirmation).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire("k1", RateLimitTier::OrderCreation).await;
        limiter.acquire("k1", RateLimitTier::OrderCreation).await;
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_try_acquire_exhausted() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::default().with_limit(RateLimitTier::OrderCreation, 2),
        );

        assert!(limiter.try_acquire("k1", RateLimitTier::OrderCreation).await);
        assert!(limiter.try_acquire("k1", RateLimitTier::OrderCreation).await);
        assert!(!limiter.try_acquire("k1", RateLimitTier::OrderCreation).await);
        assert_eq!(limiter.remaining("k1", RateLimitTier::OrderCreation).await, 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::default().with_limit(RateLimitTier::Confirmation, 1),
        );

        assert!(limiter.try_acquire("k1", RateLimitTier::Confirmation).await);
        assert!(!limiter.try_acquire("k1", RateLimitTier::Confirmation).await);
        assert!(limiter.try_acquire("k2", RateLimitTier::Confirmation).await);
        // other tiers for the same key are untouched
        assert_eq!(limiter.remaining("k1", RateLimitTier::General).await, 1000);
    }

    #[tokio::test]
    async fn test_acquire_request_counts_general() {
        let limiter = RateLimiter::with_defaults();
        limiter
            .acquire_request("k1", RateLimitTier::PaymentIdentifiers)
            .await;
        assert_eq!(
            limiter.remaining("k1", RateLimitTier::PaymentIdentifiers).await,
            49
        );
        assert_eq!(limiter.remaining("k1", RateLimitTier::General).await, 999);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_next_window() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::default()
                .with_limit(RateLimitTier::General, 1)
                .with_window(Duration::from_secs(60)),
        );

        let start = Instant::now();
        limiter.acquire("k1", RateLimitTier::General).await;
        limiter.acquire("k1", RateLimitTier::General).await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let limiter1 = RateLimiter::new(
            RateLimiterConfig::default().with_limit(RateLimitTier::General, 3),
        );
        let limiter2 = limiter1.clone();

        limiter1.acquire("k1", RateLimitTier::General).await;
        assert_eq!(limiter2.remaining("k1", RateLimitTier::General).await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_acquire() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::default().with_limit(RateLimitTier::General, 5),
        );

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let l = limiter.clone();
                tokio::spawn(async move {
                    l.acquire("k1", RateLimitTier::General).await;
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(limiter.remaining("k1", RateLimitTier::General).await, 0);
        assert!(!limiter.try_acquire("k1", RateLimitTier::General).await);
    }
}
