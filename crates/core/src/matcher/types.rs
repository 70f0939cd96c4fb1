//! Types for candidate scoring.

use serde::{Deserialize, Serialize};

use crate::searcher::Candidate;

/// Per-signal scores behind a match score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Title similarity (0.0-1.0).
    pub title: f32,
    /// Size agreement (0.0-1.0); the unknown-size score when not reported.
    pub size: f32,
    /// Layout agreement, only when the backend listed files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<f32>,
    /// Total penalty subtracted.
    pub penalty: f32,
}

/// What a policy thinks of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: f32,
    pub breakdown: ScoreBreakdown,
    /// Set when the candidate can never be accepted, whatever its score.
    pub disqualification: Option<String>,
    /// Human readable notes, most important first.
    pub reasoning: Vec<String>,
}

/// Final decision for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDecision {
    Accepted,
    BelowThreshold,
    Disqualified,
    /// Passed, but a higher-scoring candidate from the same tracker won.
    Superseded,
}

impl MatchDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchDecision::Accepted => "accepted",
            MatchDecision::BelowThreshold => "below_threshold",
            MatchDecision::Disqualified => "disqualified",
            MatchDecision::Superseded => "superseded",
        }
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: Candidate,
    pub release_id: String,
    /// Score (0.0-1.0).
    pub score: f32,
    pub breakdown: ScoreBreakdown,
    pub accepted: bool,
    pub decision: MatchDecision,
    /// Explanation of the decision.
    pub reason: String,
}
