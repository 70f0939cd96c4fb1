//! Torrent file parser - validates fetched .torrent bytes.
//!
//! Uses librqbit-core to parse bencoded .torrent data and extract the info
//! hash, root name and file listing without touching any payload.

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CandidateFile;

/// Errors that can occur when parsing torrent files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TorrentParseError {
    #[error("Failed to parse torrent: {0}")]
    ParseError(String),

    #[error("Empty torrent (no files)")]
    EmptyTorrent,
}

/// What a valid .torrent file describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentSummary {
    /// Lowercase hex info hash.
    pub info_hash: String,
    /// Root name (folder name for multi-file, file name for single-file).
    pub name: String,
    /// Paths are relative to the root, `/`-separated.
    pub files: Vec<CandidateFile>,
    pub total_size_bytes: u64,
}

/// Parse and validate a .torrent file.
///
/// Supports both single-file and multi-file torrents.
pub fn parse_torrent(bytes: &[u8]) -> Result<TorrentSummary, TorrentParseError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| TorrentParseError::ParseError(e.to_string()))?;

    let info = &torrent.info;

    let name = info
        .name
        .as_ref()
        .map(|b| bytes_to_string(b.as_ref()))
        .unwrap_or_else(|| "unknown".to_string());

    let files = if let Some(ref files) = info.files {
        files
            .iter()
            .map(|file| CandidateFile {
                path: file
                    .path
                    .iter()
                    .map(|part| bytes_to_string(part.as_ref()))
                    .collect::<Vec<_>>()
                    .join("/"),
                size_bytes: file.length,
            })
            .collect::<Vec<_>>()
    } else if let Some(length) = info.length {
        vec![CandidateFile {
            path: name.clone(),
            size_bytes: length,
        }]
    } else {
        Vec::new()
    };

    if files.is_empty() {
        return Err(TorrentParseError::EmptyTorrent);
    }

    Ok(TorrentSummary {
        info_hash: torrent.info_hash.as_string(),
        total_size_bytes: files.iter().map(|f| f.size_bytes).sum(),
        name,
        files,
    })
}

/// Convert bytes to a UTF-8 string, replacing invalid sequences.
fn bytes_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::torrent_bytes;

    #[test]
    fn test_parse_invalid_torrent() {
        assert!(matches!(
            parse_torrent(b"not a valid torrent"),
            Err(TorrentParseError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_empty_data() {
        assert!(parse_torrent(b"").is_err());
    }

    #[test]
    fn test_parse_multi_file_torrent() {
        let bytes = torrent_bytes(
            "Show.Name.S01E01.1080p-GROUP",
            &[("show.mkv", 1_000_000), ("show.nfo", 1_234), ("Subs/en.srt", 5_678)],
        );

        let summary = parse_torrent(&bytes).unwrap();
        assert_eq!(summary.name, "Show.Name.S01E01.1080p-GROUP");
        assert_eq!(summary.files.len(), 3);
        assert_eq!(summary.files[2].path, "Subs/en.srt");
        assert_eq!(summary.total_size_bytes, 1_006_912);
        assert_eq!(summary.info_hash.len(), 40);
    }

    #[test]
    fn test_parse_single_file_torrent() {
        let bytes = torrent_bytes("movie.mkv", &[("movie.mkv", 4_096)]);

        let summary = parse_torrent(&bytes).unwrap();
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.files[0].path, "movie.mkv");
        assert_eq!(summary.total_size_bytes, 4_096);
    }

    #[test]
    fn test_info_hash_is_stable() {
        let a = parse_torrent(&torrent_bytes("x", &[("a", 10), ("b", 20)])).unwrap();
        let b = parse_torrent(&torrent_bytes("x", &[("a", 10), ("b", 20)])).unwrap();
        let c = parse_torrent(&torrent_bytes("x", &[("a", 10), ("b", 21)])).unwrap();
        assert_eq!(a.info_hash, b.info_hash);
        assert_ne!(a.info_hash, c.info_hash);
    }

    #[test]
    fn test_bytes_to_string_invalid_utf8() {
        let invalid = vec![0xff, 0xfe, 0x68, 0x65, 0x6c, 0x6c, 0x6f];
        assert!(bytes_to_string(&invalid).contains("hello"));
    }
}
