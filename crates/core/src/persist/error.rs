//! Error types for the persist module.

use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::ErrorKind;
use crate::searcher::{IndexerError, TorrentParseError};

/// Errors that can occur while fetching and saving a matched torrent.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The match was not accepted by the matcher.
    #[error("Match from {tracker_id} was not accepted: {reason}")]
    NotAccepted { tracker_id: String, reason: String },

    /// Downloading the .torrent failed.
    #[error("Failed to fetch torrent: {0}")]
    Fetch(#[source] IndexerError),

    /// The downloaded bytes are not a usable .torrent.
    #[error("Invalid torrent: {0}")]
    InvalidTorrent(#[source] TorrentParseError),

    /// The torrent describes a different payload size than the release.
    #[error("Torrent size {actual} does not match release size {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Writing to the save path failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Failure category for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistError::Fetch(e) => e.kind(),
            PersistError::NotAccepted { .. }
            | PersistError::InvalidTorrent(_)
            | PersistError::SizeMismatch { .. } => ErrorKind::InvalidTorrent,
            PersistError::Io { .. } => ErrorKind::PersistIo,
        }
    }
}

/// Errors reading or writing the search history file.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to access history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse history file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
