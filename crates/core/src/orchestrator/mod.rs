//! Release orchestrator.
//!
//! Runs every local release through the matching pipeline:
//! - **Dispatch**: a producer lists the parse directory into a bounded queue
//! - **Workers**: a fixed pool, each taking one release at a time through
//!   fingerprint, search, scoring and persistence
//! - **Summary**: per-release reports folded into a [`RunSummary`]

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::CrossSeedOrchestrator;
pub use types::{
    CancelToken, ErrorKind, FailureRecord, MatchReport, OrchestratorError, ReleaseOutcome,
    ReleaseReport, ReleaseState, RunSummary, Stage,
};
