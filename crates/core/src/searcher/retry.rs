//! Bounded exponential backoff for backend calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::IndexerError;
use crate::clock::Clock;
use crate::metrics;

/// Retry settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry (default: 500ms).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay (default: 10s).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays (default: 2.0).
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            multiplier: default_multiplier(),
        }
    }
}

/// Final error of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    pub error: IndexerError,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    clock: Arc<dyn Clock>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let delay = self.config.initial_backoff_ms as f64 * self.config.multiplier.powi(exponent);
        let capped = delay.min(self.config.max_backoff_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// Only transient errors are retried. Returns the value and the number of
    /// attempts it took.
    pub async fn run<T, F, Fut>(&self, backend: &str, mut op: F) -> Result<(T, u32), RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IndexerError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok((value, attempt)),
                Err(error) if error.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt);
                    debug!(
                        backend = backend,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient backend error, retrying"
                    );
                    metrics::BACKEND_RETRIES.with_label_values(&[backend]).inc();
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if error.is_transient() {
                        warn!(backend = backend, attempts = attempt, error = %error, "Retries exhausted");
                    }
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(clock: Arc<FakeClock>) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig {
                max_attempts: 4,
                initial_backoff_ms: 100,
                max_backoff_ms: 350,
                multiplier: 2.0,
            },
            clock,
        )
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let p = policy(Arc::new(FakeClock::new()));
        assert_eq!(p.backoff_for(1), Duration::from_millis(100));
        assert_eq!(p.backoff_for(2), Duration::from_millis(200));
        assert_eq!(p.backoff_for(3), Duration::from_millis(350));
        assert_eq!(p.backoff_for(40), Duration::from_millis(350));
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_backoff_ms, 500);
        assert_eq!(config.max_backoff_ms, 10_000);
    }

    #[tokio::test]
    async fn test_success_after_transient_errors() {
        let clock = Arc::new(FakeClock::new());
        let calls = &AtomicU32::new(0);

        let result = policy(clock.clone())
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(IndexerError::Server { status: 503 })
                } else {
                    Ok("ok")
                }
            })
            .await;

        assert_eq!(result.unwrap(), ("ok", 3));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let clock = Arc::new(FakeClock::new());
        let calls = &AtomicU32::new(0);

        let result: Result<((), u32), _> = policy(clock.clone())
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(IndexerError::Timeout)
            })
            .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.error, IndexerError::Timeout);
        assert_eq!(failure.attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(clock.sleeps().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let clock = Arc::new(FakeClock::new());
        let calls = &AtomicU32::new(0);

        let result: Result<((), u32), _> = policy(clock.clone())
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(IndexerError::Client { status: 404 })
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
    }
}
