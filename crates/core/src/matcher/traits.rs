//! Pluggable matching policy.

use crate::fingerprint::Fingerprint;
use crate::searcher::Candidate;

use super::types::Evaluation;

/// Trait for scoring one candidate against a release fingerprint.
///
/// Implementations decide similarity and disqualification; the
/// [`super::Matcher`] applies the threshold and the per-tracker tie-break.
pub trait MatchPolicy: Send + Sync {
    /// Name of this policy for logging.
    fn name(&self) -> &str;

    /// Minimum score for acceptance (0.0-1.0).
    fn threshold(&self) -> f32;

    /// Score a candidate. Score is 0.0-1.0 where 1.0 is a perfect match.
    fn evaluate(&self, fingerprint: &Fingerprint, candidate: &Candidate) -> Evaluation;
}
