//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the release worker pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of releases processed concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the queue between the directory scan and the workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Pause each worker takes after finishing a release (milliseconds).
    /// Spreads load on the indexers for large parse directories.
    #[serde(default)]
    pub delay_between_releases_ms: u64,
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            delay_between_releases_ms: 0,
        }
    }
}
