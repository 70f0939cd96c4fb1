//! Fetch-and-save for accepted matches.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::PersistError;
use super::history::SearchHistory;
use super::store::FsTorrentStore;
use super::types::{PersistOutcome, SavedTorrentRecord, SkipReason};
use crate::matcher::MatchResult;
use crate::metrics;
use crate::release::LocalRelease;
use crate::searcher::{parse_torrent, IndexerClient};

/// Downloads the .torrent of an accepted match and writes it to the save path.
#[derive(Clone)]
pub struct TorrentPersister {
    client: Arc<IndexerClient>,
    store: Arc<FsTorrentStore>,
    history: Option<Arc<SearchHistory>>,
    verify_size: bool,
}

impl TorrentPersister {
    pub fn new(client: Arc<IndexerClient>, store: Arc<FsTorrentStore>, verify_size: bool) -> Self {
        Self {
            client,
            store,
            history: None,
            verify_size,
        }
    }

    /// Skip candidates the history marks as grabbed, and record new grabs.
    pub fn with_history(mut self, history: Arc<SearchHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn store(&self) -> &FsTorrentStore {
        &self.store
    }

    /// Persist one match.
    ///
    /// Holds the per-target lock for the whole call, so two workers racing on
    /// the same release/tracker pair produce one fetch and one file.
    pub async fn persist(
        &self,
        result: &MatchResult,
        release: &LocalRelease,
    ) -> Result<PersistOutcome, PersistError> {
        let outcome = self.persist_inner(result, release).await;
        let label = match &outcome {
            Ok(PersistOutcome::Saved(_)) => "saved",
            Ok(PersistOutcome::Skipped(reason)) => reason.as_str(),
            Err(_) => "error",
        };
        metrics::TORRENTS_PERSISTED.with_label_values(&[label]).inc();
        outcome
    }

    async fn persist_inner(
        &self,
        result: &MatchResult,
        release: &LocalRelease,
    ) -> Result<PersistOutcome, PersistError> {
        let candidate = &result.candidate;
        if !result.accepted {
            return Err(PersistError::NotAccepted {
                tracker_id: candidate.tracker_id.clone(),
                reason: result.reason.clone(),
            });
        }

        let file_name = FsTorrentStore::file_name(&result.release_id, &candidate.tracker_id);
        let target = self.store.save_dir().join(&file_name);

        let _lock = self.store.lock(&file_name).await;

        if self.store.exists(&target).await? {
            debug!(
                release = %result.release_id,
                tracker = %candidate.tracker_id,
                path = %target.display(),
                "Torrent already saved"
            );
            return Ok(PersistOutcome::Skipped(SkipReason::AlreadySaved));
        }

        if let Some(history) = &self.history {
            if history.is_grabbed(candidate).await {
                debug!(
                    release = %result.release_id,
                    tracker = %candidate.tracker_id,
                    "Torrent grabbed in an earlier run"
                );
                return Ok(PersistOutcome::Skipped(SkipReason::PreviouslyGrabbed));
            }
        }

        let bytes = self
            .client
            .fetch_torrent_bytes(candidate)
            .await
            .map_err(PersistError::Fetch)?;

        let summary = parse_torrent(&bytes).map_err(PersistError::InvalidTorrent)?;

        let expected = release.total_size_bytes();
        if self.verify_size && summary.total_size_bytes != expected {
            warn!(
                release = %result.release_id,
                tracker = %candidate.tracker_id,
                expected,
                actual = summary.total_size_bytes,
                "Fetched torrent size differs from release"
            );
            return Err(PersistError::SizeMismatch {
                expected,
                actual: summary.total_size_bytes,
            });
        }

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let content_sha256 = format!("{:x}", hasher.finalize());

        self.store.write_atomic(&target, &bytes).await?;

        if let Some(history) = &self.history {
            history.record_grab(candidate).await;
        }

        info!(
            release = %result.release_id,
            tracker = %candidate.tracker_id,
            score = result.score,
            path = %target.display(),
            info_hash = %summary.info_hash,
            "Saved torrent"
        );

        Ok(PersistOutcome::Saved(SavedTorrentRecord {
            path: target,
            release_id: result.release_id.clone(),
            tracker_id: candidate.tracker_id.clone(),
            info_hash: Some(summary.info_hash),
            content_sha256,
            size_bytes: summary.total_size_bytes,
            saved_at: Utc::now(),
        }))
    }
}
