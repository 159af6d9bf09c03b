//! Bounded status polling
//!
//! Re-fetches a resource on a fixed interval until a predicate holds, the
//! resource reports that it was cancelled, or the attempt budget runs out.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// A resource that can be polled for progress
pub trait Pollable {
    /// The resource reached the terminal failure state
    fn is_cancelled(&self) -> bool;

    /// Short description for log lines and exhaustion errors
    fn describe(&self) -> String;
}

/// Polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_millis(5000),
        }
    }
}

impl PollConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Fetch until `predicate` holds.
///
/// The predicate is checked before the cancellation test, so waiting for a
/// cancelled resource succeeds. No sleep follows the final attempt.
pub async fn poll_until<F, Fut, R, P>(config: &PollConfig, mut fetch: F, mut predicate: P) -> Result<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R>>,
    R: Pollable,
    P: FnMut(&R) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_seen = None;

    for attempt in 1..=max_attempts {
        let resource = fetch().await?;

        if predicate(&resource) {
            tracing::info!(
                attempt,
                resource = %resource.describe(),
                "Polling condition met"
            );
            return Ok(resource);
        }
        if resource.is_cancelled() {
            tracing::warn!(resource = %resource.describe(), "Resource cancelled while polling");
            return Err(Error::PollCancelled);
        }

        tracing::debug!(
            "Poll attempt {}/{}: {}",
            attempt,
            max_attempts,
            resource.describe()
        );
        last_seen = Some(resource.describe());

        if attempt < max_attempts {
            sleep(config.interval).await;
        }
    }

    Err(Error::PollExhausted {
        attempts: max_attempts,
        message: format!(
            "condition not met, last seen {}",
            last_seen.unwrap_or_else(|| "nothing".to_string())
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    struct Transfer {
        status: &'static str,
    }

    impl Pollable for Transfer {
        fn is_cancelled(&self) -> bool {
            self.status == "cancelled"
        }

        fn describe(&self) -> String {
            format!("transfer status={}", self.status)
        }
    }

    fn sequence(statuses: &[&'static str]) -> Mutex<VecDeque<Transfer>> {
        Mutex::new(statuses.iter().map(|&status| Transfer { status }).collect())
    }

    fn fetcher(
        queue: &Mutex<VecDeque<Transfer>>,
    ) -> impl FnMut() -> std::future::Ready<Result<Transfer>> + '_ {
        move || {
            std::future::ready(
                queue
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| Error::Transport("sequence exhausted".to_string())),
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_when_target_reached() {
        let queue = sequence(&["pending", "pending", "received", "received"]);
        let config = PollConfig::default().with_max_attempts(5);

        let result = poll_until(&config, fetcher(&queue), |t| t.status == "received")
            .await
            .unwrap();

        assert_eq!(result.status, "received");
        // one item left: three fetches happened
        assert_eq!(queue.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_attempts_only() {
        let queue = sequence(&["pending", "pending", "received"]);
        let config = PollConfig::default().with_interval(Duration::from_secs(5));
        let start = Instant::now();

        poll_until(&config, fetcher(&queue), |t| t.status == "received")
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_cancelled() {
        let queue = sequence(&["pending", "cancelled", "received"]);
        let config = PollConfig::default().with_max_attempts(5);

        let err = poll_until(&config, fetcher(&queue), |t| t.status == "received")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PollCancelled));
        assert!(err.to_string().contains("cancelled"));
        // the "received" entry was never fetched
        assert_eq!(queue.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_for_cancelled_succeeds() {
        let queue = sequence(&["pending", "cancelled"]);
        let config = PollConfig::default();

        let result = poll_until(&config, fetcher(&queue), |t| t.status == "cancelled")
            .await
            .unwrap();
        assert!(result.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion() {
        let queue = sequence(&["pending"; 3]);
        let config = PollConfig::default().with_max_attempts(3);

        let err = poll_until(&config, fetcher(&queue), |t| t.status == "received")
            .await
            .unwrap_err();

        match err {
            Error::PollExhausted { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("pending"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_propagates() {
        let queue = sequence(&[]);
        let err = poll_until(&PollConfig::default(), fetcher(&queue), |_| true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
