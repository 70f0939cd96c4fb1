//! Types for the indexer search system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orchestrator::ErrorKind;

/// Query sent to every backend for one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search query (title, plus year when known).
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<SearchCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Optional: limit to specific tracker ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackers: Option<Vec<String>>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
            season: None,
            episode: None,
            trackers: None,
        }
    }
}

/// Content category for filtering search results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Movies,
    Tv,
    Audio,
    Books,
    Other,
}

impl SearchCategory {
    /// Torznab category id.
    pub fn torznab_id(self) -> u32 {
        match self {
            SearchCategory::Movies => 2000,
            SearchCategory::Audio => 3000,
            SearchCategory::Tv => 5000,
            SearchCategory::Books => 7000,
            SearchCategory::Other => 8000,
        }
    }
}

/// A file within a candidate torrent, when the backend lists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Path within the torrent.
    pub path: String,
    pub size_bytes: u64,
}

/// A single raw search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    /// Total size in bytes; `None` when the backend did not report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// .torrent download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_uri: Option<String>,
    /// Direct link to the torrent page on the tracker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_uri: Option<String>,
    /// Tracker identifier (e.g. Jackett `TrackerId`).
    pub tracker_id: String,
    /// Human readable tracker name.
    pub tracker_name: String,
    /// Backend that returned this result.
    pub indexer_id: String,
    /// Info hash (lowercase hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<CandidateFile>>,
}

/// Errors returned by an indexer backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexerError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Backend server error: HTTP {status}")]
    Server { status: u16 },

    #[error("Rate limited by backend")]
    RateLimited,

    #[error("Request rejected: HTTP {status}")]
    Client { status: u16 },

    #[error("Unauthorized: HTTP {status}")]
    Unauthorized { status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("Candidate has no download link")]
    NoDownloadLink,

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("All backends are disabled")]
    AllBackendsExhausted,
}

impl IndexerError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => IndexerError::RateLimited,
            401 | 403 => IndexerError::Unauthorized { status },
            500..=599 => IndexerError::Server { status },
            400..=499 => IndexerError::Client { status },
            _ => IndexerError::InvalidResponse(format!("unexpected HTTP status {}", status)),
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IndexerError::Timeout
        } else if err.is_connect() || err.is_request() {
            IndexerError::Connection(err.to_string())
        } else if err.is_decode() {
            IndexerError::InvalidResponse(err.to_string())
        } else {
            IndexerError::Connection(err.to_string())
        }
    }

    /// Worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IndexerError::Timeout
                | IndexerError::Connection(_)
                | IndexerError::Server { .. }
                | IndexerError::RateLimited
        )
    }

    /// Disables the backend for the rest of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IndexerError::Unauthorized { .. }
                | IndexerError::InvalidConfig(_)
                | IndexerError::AllBackendsExhausted
        )
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_transient() {
            ErrorKind::TransientBackend
        } else {
            ErrorKind::PermanentBackend
        }
    }
}

/// A backend that contributed nothing to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendFailure {
    pub backend: String,
    pub kind: ErrorKind,
    pub message: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Whether the backend got disabled by this failure.
    pub disabled: bool,
}

/// Merged result of a multi-backend search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BackendFailure>,
    /// Backends that were active when the query started.
    #[serde(default)]
    pub backends_queried: usize,
}

impl SearchOutcome {
    /// Every queried backend failed, so an empty result means nothing.
    pub fn all_failed(&self) -> bool {
        self.backends_queried > 0 && self.failures.len() >= self.backends_queried
    }
}

/// Trait for indexer search backends.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Backend identifier, unique within a run.
    fn id(&self) -> &str;

    /// Execute one search request.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, IndexerError>;

    /// Download the .torrent bytes of a candidate this backend returned.
    async fn fetch_torrent(&self, candidate: &Candidate) -> Result<Vec<u8>, IndexerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_minimal() {
        let json = r#"{"text": "minimal"}"#;
        let parsed: SearchQuery = serde_json::from_str(json).unwrap();

        assert_eq!(parsed, SearchQuery::new("minimal"));
    }

    #[test]
    fn test_search_category_serialization() {
        assert_eq!(serde_json::to_string(&SearchCategory::Tv).unwrap(), "\"tv\"");
        assert_eq!(SearchCategory::Movies.torznab_id(), 2000);
        assert_eq!(SearchCategory::Tv.torznab_id(), 5000);
    }

    #[test]
    fn test_error_from_status() {
        assert_eq!(IndexerError::from_status(429), IndexerError::RateLimited);
        assert_eq!(
            IndexerError::from_status(403),
            IndexerError::Unauthorized { status: 403 }
        );
        assert_eq!(
            IndexerError::from_status(502),
            IndexerError::Server { status: 502 }
        );
        assert_eq!(
            IndexerError::from_status(404),
            IndexerError::Client { status: 404 }
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(IndexerError::Timeout.is_transient());
        assert!(IndexerError::RateLimited.is_transient());
        assert!(IndexerError::Server { status: 503 }.is_transient());
        assert!(!IndexerError::Client { status: 404 }.is_transient());
        assert!(!IndexerError::InvalidResponse("x".into()).is_transient());

        assert!(IndexerError::Unauthorized { status: 401 }.is_fatal());
        assert!(IndexerError::InvalidConfig("x".into()).is_fatal());
        assert!(!IndexerError::Timeout.is_fatal());

        assert_eq!(IndexerError::Timeout.kind(), ErrorKind::TransientBackend);
        assert_eq!(
            IndexerError::Client { status: 400 }.kind(),
            ErrorKind::PermanentBackend
        );
    }

    #[test]
    fn test_candidate_serialization_skips_missing_fields() {
        let candidate = Candidate {
            title: "Show Name S01E01".to_string(),
            size_bytes: None,
            download_uri: None,
            details_uri: None,
            tracker_id: "trackera".to_string(),
            tracker_name: "Tracker A".to_string(),
            indexer_id: "jackett".to_string(),
            info_hash: None,
            category: None,
            files: None,
        };

        let json = serde_json::to_string(&candidate).unwrap();
        assert!(!json.contains("size_bytes"));
        assert!(!json.contains("download_uri"));

        let parsed: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, candidate);
    }
}
