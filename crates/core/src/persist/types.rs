//! Types for the persist module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A .torrent file written to the save path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTorrentRecord {
    pub path: PathBuf,
    pub release_id: String,
    pub tracker_id: String,
    /// Info hash from the parsed torrent (lowercase hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    /// SHA-256 of the .torrent file bytes.
    pub content_sha256: String,
    /// Payload size described by the torrent.
    pub size_bytes: u64,
    pub saved_at: DateTime<Utc>,
}

/// Why a persist call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A torrent for this release and tracker is already in the save path.
    AlreadySaved,
    /// The search history says this torrent was grabbed before.
    PreviouslyGrabbed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadySaved => "already_saved",
            SkipReason::PreviouslyGrabbed => "previously_grabbed",
        }
    }
}

/// Result of a persist call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistOutcome {
    Saved(SavedTorrentRecord),
    Skipped(SkipReason),
}

impl PersistOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistOutcome::Saved(_))
    }
}
