//! Minimum-interval rate gate for a single backend.
//!
//! Every request to a backend passes through its gate. The gate is shared by
//! all workers, so requests to one backend are spaced by at least
//! `min_interval` no matter how many releases are in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::clock::Clock;

/// Rate gate status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateGateStatus {
    pub min_interval_ms: u64,
    /// Time until the next request may pass, if it would have to wait.
    pub next_available_in_ms: Option<u64>,
}

pub struct RateGate {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    /// When the last request was let through.
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            clock,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request may be sent, then claim the slot.
    ///
    /// The lock is held while sleeping so waiters pass one at a time.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(wait) = self.remaining(*last) {
            self.clock.sleep(wait).await;
        }
        *last = Some(self.clock.now());
    }

    pub async fn status(&self) -> RateGateStatus {
        let last = self.last.lock().await;
        RateGateStatus {
            min_interval_ms: self.min_interval.as_millis() as u64,
            next_available_in_ms: self.remaining(*last).map(|d| d.as_millis() as u64),
        }
    }

    fn remaining(&self, last: Option<Instant>) -> Option<Duration> {
        let elapsed = self.clock.now().saturating_duration_since(last?);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }
}
