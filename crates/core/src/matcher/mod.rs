//! Matcher/Scorer.
//!
//! Compares a release [`crate::fingerprint::Fingerprint`] with indexer
//! candidates. Scoring is delegated to a [`MatchPolicy`]; the [`Matcher`]
//! applies the acceptance threshold and keeps the best candidate per tracker.

mod config;
mod default_policy;
mod scorer;
mod traits;
mod types;

pub use config::MatchingConfig;
pub use default_policy::DefaultMatchPolicy;
pub use scorer::Matcher;
pub use traits::MatchPolicy;
pub use types::{Evaluation, MatchDecision, MatchResult, ScoreBreakdown};
