//! Clock and sleeper abstraction.
//!
//! Rate gates and retry loops suspend through a [`Clock`] instead of calling
//! `tokio::time` directly, so tests can run backoff schedules against a
//! [`crate::testing::FakeClock`] without real delays.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Source of time and suspension.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Suspend the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
