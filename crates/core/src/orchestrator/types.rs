//! Types for the release orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::persist::HistoryError;
use crate::release::ScanError;
use crate::searcher::{BackendFailure, IndexerError};

/// Errors that stop a run before any release is processed.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No backend is enabled.
    #[error("no enabled indexer backend")]
    NoBackends,

    /// The parse directory could not be listed.
    #[error("parse directory unreadable: {0}")]
    ParseDirUnreadable(#[source] ScanError),

    /// The search history could not be loaded.
    #[error("search history error: {0}")]
    History(#[from] HistoryError),

    /// A backend could not be built from its configuration.
    #[error("backend error: {0}")]
    Backend(#[from] IndexerError),
}

/// Where a release is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseState {
    Pending,
    Fingerprinted,
    Queried,
    Scored,
    Persisted,
    /// Terminal; reachable from every other state.
    Errored,
}

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scan,
    Fingerprint,
    Query,
    Score,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Fingerprint => "fingerprint",
            Stage::Query => "query",
            Stage::Score => "score",
            Stage::Persist => "persist",
        }
    }
}

/// Failure category shared by every module's errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientBackend,
    PermanentBackend,
    LocalRead,
    PersistConflict,
    PersistIo,
    InvalidTorrent,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientBackend => "transient_backend",
            ErrorKind::PermanentBackend => "permanent_backend",
            ErrorKind::LocalRead => "local_read",
            ErrorKind::PersistConflict => "persist_conflict",
            ErrorKind::PersistIo => "persist_io",
            ErrorKind::InvalidTorrent => "invalid_torrent",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub release_id: String,
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

/// How a release ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// At least one candidate was accepted and nothing failed.
    Matched,
    /// Searched, but no candidate was accepted.
    Unmatched,
    /// Not searched (empty, no usable title, or searched in an earlier run).
    Skipped,
    Failed,
}

impl ReleaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseOutcome::Matched => "matched",
            ReleaseOutcome::Unmatched => "unmatched",
            ReleaseOutcome::Skipped => "skipped",
            ReleaseOutcome::Failed => "failed",
        }
    }
}

/// What happened to one accepted match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub tracker_id: String,
    pub title: String,
    pub score: f32,
    /// "saved", "skipped" or "failed".
    pub outcome: String,
    /// Set for skipped duplicates (`persist_conflict`) and failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Per-release report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseReport {
    pub release_id: String,
    pub state: ReleaseState,
    pub outcome: ReleaseOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub candidates: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backend_failures: Vec<BackendFailure>,
}

impl ReleaseReport {
    pub fn new(release_id: impl Into<String>) -> Self {
        Self {
            release_id: release_id.into(),
            state: ReleaseState::Pending,
            outcome: ReleaseOutcome::Unmatched,
            skip_reason: None,
            candidates: 0,
            matches: Vec::new(),
            failures: Vec::new(),
            backend_failures: Vec::new(),
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Releases found in the parse directory.
    pub releases_found: usize,
    /// Releases a worker picked up.
    pub releases_scanned: usize,
    pub releases_matched: usize,
    pub releases_skipped: usize,
    pub releases_unmatched: usize,
    pub releases_failed: usize,
    pub matches_found: usize,
    pub matches_persisted: usize,
    pub matches_skipped: usize,
    pub failures: Vec<FailureRecord>,
    pub backend_failures: Vec<BackendFailure>,
    /// Dispatch stopped because the run was cancelled.
    pub cancelled: bool,
    /// Dispatch stopped because every backend got disabled.
    pub halted: bool,
    pub releases: Vec<ReleaseReport>,
}

impl RunSummary {
    /// Build the summary from per-release reports.
    pub fn from_reports(
        started_at: DateTime<Utc>,
        releases_found: usize,
        mut releases: Vec<ReleaseReport>,
    ) -> Self {
        releases.sort_by(|a, b| a.release_id.cmp(&b.release_id));

        let count = |outcome: ReleaseOutcome| releases.iter().filter(|r| r.outcome == outcome).count();
        let count_matches = |outcome: &str| {
            releases
                .iter()
                .flat_map(|r| &r.matches)
                .filter(|m| m.outcome == outcome)
                .count()
        };

        Self {
            started_at,
            finished_at: Utc::now(),
            releases_found,
            releases_scanned: releases.len(),
            releases_matched: count(ReleaseOutcome::Matched),
            releases_skipped: count(ReleaseOutcome::Skipped),
            releases_unmatched: count(ReleaseOutcome::Unmatched),
            releases_failed: count(ReleaseOutcome::Failed),
            matches_found: releases.iter().map(|r| r.matches.len()).sum(),
            matches_persisted: count_matches("saved"),
            matches_skipped: count_matches("skipped"),
            failures: releases.iter().flat_map(|r| r.failures.clone()).collect(),
            backend_failures: releases
                .iter()
                .flat_map(|r| r.backend_failures.clone())
                .collect(),
            cancelled: false,
            halted: false,
            releases,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Cooperative cancellation shared between the caller and the workers.
///
/// Cloning gives another handle to the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any token, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(id: &str, outcome: ReleaseOutcome) -> ReleaseReport {
        ReleaseReport {
            outcome,
            ..ReleaseReport::new(id)
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut matched = report("b", ReleaseOutcome::Matched);
        for outcome in ["saved", "saved", "skipped"] {
            matched.matches.push(MatchReport {
                tracker_id: "t".to_string(),
                title: "x".to_string(),
                score: 1.0,
                outcome: outcome.to_string(),
                kind: None,
                path: None,
                message: String::new(),
            });
        }
        let mut failed = report("a", ReleaseOutcome::Failed);
        failed.failures.push(FailureRecord {
            release_id: "a".to_string(),
            stage: Stage::Scan,
            kind: ErrorKind::LocalRead,
            message: "unreadable".to_string(),
        });

        let summary = RunSummary::from_reports(
            Utc::now(),
            5,
            vec![matched, failed, report("c", ReleaseOutcome::Skipped), report("d", ReleaseOutcome::Unmatched)],
        );

        assert_eq!(summary.releases_found, 5);
        assert_eq!(summary.releases_scanned, 4);
        assert_eq!(summary.releases_matched, 1);
        assert_eq!(summary.releases_failed, 1);
        assert_eq!(summary.releases_skipped, 1);
        assert_eq!(summary.releases_unmatched, 1);
        assert_eq!(summary.matches_found, 3);
        assert_eq!(summary.matches_persisted, 2);
        assert_eq!(summary.matches_skipped, 1);
        assert!(summary.has_failures());
        assert_eq!(summary.releases[0].release_id, "a");
    }

    #[test]
    fn test_summary_serialization() {
        let summary = RunSummary::from_reports(Utc::now(), 0, Vec::new());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["releases_scanned"], 0);
        assert_eq!(json["cancelled"], false);

        let parsed: RunSummary = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_error_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::PersistConflict).unwrap(),
            "\"persist_conflict\""
        );
        assert_eq!(ErrorKind::LocalRead.to_string(), "local_read");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(OrchestratorError::NoBackends.to_string(), "no enabled indexer backend");
    }

    #[tokio::test]
    async fn test_cancel_token() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());

        let waiter = tokio::spawn(async move { other.cancelled().await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());
        // Already cancelled resolves immediately.
        token.cancelled().await;
    }
}
