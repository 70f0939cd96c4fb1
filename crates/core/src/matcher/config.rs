//! Matcher configuration types.

use serde::{Deserialize, Serialize};

/// Scoring weights and the acceptance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum score for a candidate to be accepted (default: 0.75).
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Compare the fetched torrent's total size with the release before
    /// saving it (default: true).
    #[serde(default = "default_true")]
    pub verify_torrent_size: bool,
    /// Weight of title similarity in the base score.
    #[serde(default = "default_half")]
    pub title_weight: f32,
    /// Weight of size agreement in the base score.
    #[serde(default = "default_half")]
    pub size_weight: f32,
    /// Share of the final score given to layout shape when the backend
    /// exposes a file list.
    #[serde(default = "default_shape_weight")]
    pub shape_weight: f32,
    /// Size score used when the candidate reports no size.
    #[serde(default = "default_unknown_size_score")]
    pub unknown_size_score: f32,
    /// Subtracted when the candidate's resolution differs from the release's.
    #[serde(default = "default_resolution_penalty")]
    pub resolution_conflict_penalty: f32,
}

fn default_threshold() -> f32 {
    0.75
}

fn default_true() -> bool {
    true
}

fn default_half() -> f32 {
    0.5
}

fn default_shape_weight() -> f32 {
    0.2
}

fn default_unknown_size_score() -> f32 {
    0.6
}

fn default_resolution_penalty() -> f32 {
    0.15
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            verify_torrent_size: true,
            title_weight: default_half(),
            size_weight: default_half(),
            shape_weight: default_shape_weight(),
            unknown_size_score: default_unknown_size_score(),
            resolution_conflict_penalty: default_resolution_penalty(),
        }
    }
}
