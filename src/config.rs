//! Configuration management
//!
//! Loads the JSON configuration file used by the command-line tool and turns
//! it into a [`ClientConfig`]. Every section is optional and falls back to
//! the documented defaults. The API key is never read from this file.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::common::{PollConfig, RateLimitPolicy, RateLimitTier, RateLimiterConfig, RetryPolicy};
use crate::orders::{ClientConfig, API_BASE_URL};
use crate::validation::AmountLimits;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub polling: PollingConfig,
    pub limits: LimitsConfig,
    pub local_rate_limiter: LocalRateLimiterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub non_retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            non_retryable_statuses: vec![401, 403, 404],
        }
    }
}

/// Reaction to HTTP 429
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_retries: u32,
    pub default_retry_after_secs: u64,
    pub max_jitter_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            default_retry_after_secs: 5,
            max_jitter_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval_ms: 5000,
        }
    }
}

/// Order amount range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    #[serde(with = "rust_decimal::serde::float")]
    pub min_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_amount: Decimal,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = AmountLimits::default();
        Self {
            min_amount: limits.min,
            max_amount: limits.max,
        }
    }
}

/// In-process request budget per tier, requests per window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalRateLimiterConfig {
    pub enabled: bool,
    pub window_secs: u64,
    pub general: u32,
    pub order_creation: u32,
    pub confirmation: u32,
    pub payment_identifiers: u32,
}

impl Default for LocalRateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 3600,
            general: RateLimitTier::General.documented_limit(),
            order_creation: RateLimitTier::OrderCreation.documented_limit(),
            confirmation: RateLimitTier::Confirmation.documented_limit(),
            payment_identifiers: RateLimitTier::PaymentIdentifiers.documented_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must not be empty");
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be positive");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.polling.max_attempts == 0 {
            bail!("polling.max_attempts must be at least 1");
        }
        if self.limits.min_amount >= self.limits.max_amount {
            bail!(
                "limits.min_amount ({}) must be below limits.max_amount ({})",
                self.limits.min_amount,
                self.limits.max_amount
            );
        }
        let local = &self.local_rate_limiter;
        if local.enabled {
            if local.window_secs == 0 {
                bail!("local_rate_limiter.window_secs must be positive");
            }
            for (name, requests) in [
                ("general", local.general),
                ("order_creation", local.order_creation),
                ("confirmation", local.confirmation),
                ("payment_identifiers", local.payment_identifiers),
            ] {
                if requests == 0 {
                    bail!("local_rate_limiter.{} must be at least 1", name);
                }
            }
        }
        Ok(())
    }

    /// Build the library configuration
    pub fn to_client_config(&self) -> ClientConfig {
        let retry = RetryPolicy::default()
            .with_max_attempts(self.retry.max_attempts)
            .with_base_delay(Duration::from_millis(self.retry.base_delay_ms))
            .with_non_retryable_statuses(self.retry.non_retryable_statuses.clone());

        let rate_limit = RateLimitPolicy::default()
            .with_max_retries(self.rate_limit.max_retries)
            .with_default_retry_after(Duration::from_secs(self.rate_limit.default_retry_after_secs))
            .with_max_jitter(Duration::from_millis(self.rate_limit.max_jitter_ms));

        let poll = PollConfig::default()
            .with_max_attempts(self.polling.max_attempts)
            .with_interval(Duration::from_millis(self.polling.interval_ms));

        let local = &self.local_rate_limiter;
        let rate_limiter = local.enabled.then(|| {
            RateLimiterConfig::default()
                .with_window(Duration::from_secs(local.window_secs))
                .with_limit(RateLimitTier::General, local.general)
                .with_limit(RateLimitTier::OrderCreation, local.order_creation)
                .with_limit(RateLimitTier::Confirmation, local.confirmation)
                .with_limit(RateLimitTier::PaymentIdentifiers, local.payment_identifiers)
        });

        ClientConfig::default()
            .with_base_url(self.api.base_url.clone())
            .with_timeout(Duration::from_secs(self.api.timeout_secs))
            .with_retry(retry)
            .with_rate_limit(rate_limit)
            .with_poll(poll)
            .with_amount_limits(AmountLimits::new(
                self.limits.min_amount,
                self.limits.max_amount,
            ))
            .with_rate_limiter(rate_limiter)
    }
}
