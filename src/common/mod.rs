//! Resilience utilities shared by the API client
//!
//! This module contains reusable pieces that wrap every API call:
//! - Retry with exponential backoff, and capped handling of HTTP 429
//! - Bounded polling for asynchronous state transitions
//! - A local per-key, per-tier request budget

pub mod poll;
pub mod rate_limiter;
pub mod retry;

pub use poll::{poll_until, PollConfig, Pollable};
pub use rate_limiter::{RateLimitTier, RateLimiter, RateLimiterConfig};
pub use retry::{retry_with_backoff, with_rate_limit_retry, RateLimitPolicy, RetryPolicy};
