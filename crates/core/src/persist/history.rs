//! Persistent search and grab history.
//!
//! Stored as JSON next to the saved torrents:
//!
//! ```json
//! {
//!   "basenames_searched": ["Show.Name.S01E01.1080p-GROUP"],
//!   "download_history": { "trackera": ["/torrents/12345"] }
//! }
//! ```
//!
//! Grabs are keyed by the path of the candidate's details URL so the same
//! torrent is recognized even when the tracker host changes.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::HistoryError;
use crate::searcher::Candidate;

static URL_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^/]+(.+)").unwrap());

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct HistoryData {
    #[serde(default)]
    basenames_searched: BTreeSet<String>,
    #[serde(default)]
    download_history: BTreeMap<String, BTreeSet<String>>,
}

/// Host-insensitive key for a URL: everything after the authority.
fn url_key(url: &str) -> String {
    URL_PATH
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| url.to_string())
}

/// Search history shared by all workers.
#[derive(Debug)]
pub struct SearchHistory {
    path: PathBuf,
    data: RwLock<HistoryData>,
    dirty: AtomicBool,
}

impl SearchHistory {
    /// Load the history at `path`. A missing file starts an empty history.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let data = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| HistoryError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No history file yet");
                HistoryData::default()
            }
            Err(e) => return Err(HistoryError::Io { path, source: e }),
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn was_searched(&self, basename: &str) -> bool {
        self.data.read().await.basenames_searched.contains(basename)
    }

    pub async fn mark_searched(&self, basename: &str) {
        if self
            .data
            .write()
            .await
            .basenames_searched
            .insert(basename.to_string())
        {
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Whether this candidate was grabbed in an earlier run.
    pub async fn is_grabbed(&self, candidate: &Candidate) -> bool {
        let Some(details) = candidate.details_uri.as_deref() else {
            return false;
        };
        let key = url_key(details);
        self.data
            .read()
            .await
            .download_history
            .get(&candidate.tracker_id)
            .is_some_and(|grabbed| grabbed.contains(&key))
    }

    pub async fn record_grab(&self, candidate: &Candidate) {
        let Some(details) = candidate.details_uri.as_deref() else {
            return;
        };
        let inserted = self
            .data
            .write()
            .await
            .download_history
            .entry(candidate.tracker_id.clone())
            .or_default()
            .insert(url_key(details));
        if inserted {
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Write the history if it changed since the last save.
    ///
    /// Uses the same temp-file-and-rename scheme as torrent writes.
    pub async fn save(&self) -> Result<(), HistoryError> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let json = {
            let data = self.data.read().await;
            serde_json::to_vec_pretty(&*data).map_err(|e| HistoryError::Parse {
                path: self.path.clone(),
                message: e.to_string(),
            })?
        };

        if let Err(e) = self.write(&json).await {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }

        info!(path = %self.path.display(), "Saved search history");
        Ok(())
    }

    async fn write(&self, json: &[u8]) -> Result<(), HistoryError> {
        let io_err = |path: &Path, source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| io_err(parent, e))?;
        }

        let temp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&temp, json).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_err(&temp, e));
        }
        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }
}
