//! Testing utilities and mock implementations.
//!
//! This module provides a mock indexer, a virtual clock and fixtures so the
//! whole pipeline can be exercised without a Jackett server or real delays.
//!
//! # Example
//!
//! ```rust,ignore
//! use crossseed_core::testing::{fixtures, FakeClock, MockIndexer};
//!
//! let clock = Arc::new(FakeClock::new());
//! let indexer = Arc::new(MockIndexer::new("jackett"));
//! indexer.add_candidate(fixtures::candidate("jackett", "trackera", "Show Name S01E01", Some(1_000)));
//!
//! let client = IndexerClient::new(RetryConfig::default(), clock.clone())
//!     .with_backend(indexer.clone(), Duration::from_millis(500));
//! ```

mod fake_clock;
mod mock_indexer;

pub use fake_clock::FakeClock;
pub use mock_indexer::MockIndexer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::release::{FileEntry, LocalRelease};
    use crate::searcher::Candidate;

    const PIECE_LENGTH: u64 = 256 * 1024;

    /// Create a candidate with reasonable defaults.
    ///
    /// The download URI is unique per backend, tracker, title and size.
    pub fn candidate(indexer_id: &str, tracker_id: &str, title: &str, size_bytes: Option<u64>) -> Candidate {
        let slug = urlencoding::encode(title).into_owned();
        let size = size_bytes.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string());
        Candidate {
            title: title.to_string(),
            size_bytes,
            download_uri: Some(format!(
                "http://{}/dl/{}/{}?size={}",
                indexer_id, tracker_id, slug, size
            )),
            details_uri: Some(format!("https://{}.example/torrents/{}-{}", tracker_id, slug, size)),
            tracker_id: tracker_id.to_string(),
            tracker_name: tracker_id.to_uppercase(),
            indexer_id: indexer_id.to_string(),
            info_hash: None,
            category: None,
            files: None,
        }
    }

    /// In-memory release.
    pub fn local_release(id: &str, files: &[(&str, u64)]) -> LocalRelease {
        LocalRelease::new(
            id,
            format!("/data/{}", id),
            files.iter().map(|(path, size)| FileEntry::new(*path, *size)).collect(),
        )
    }

    /// Create a release directory under `root` with sparse files of the
    /// given sizes. Returns the release path.
    pub fn release_on_disk(root: &Path, name: &str, files: &[(&str, u64)]) -> PathBuf {
        let release = root.join(name);
        for (relative, size) in files {
            let path = release.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            let file = std::fs::File::create(&path).unwrap();
            file.set_len(*size).unwrap();
        }
        if files.is_empty() {
            std::fs::create_dir_all(&release).unwrap();
        }
        release
    }

    /// Create a single-file release `root/name` of `size` bytes.
    pub fn file_release_on_disk(root: &Path, name: &str, size: u64) -> PathBuf {
        let path = root.join(name);
        std::fs::create_dir_all(root).unwrap();
        std::fs::File::create(&path).unwrap().set_len(size).unwrap();
        path
    }

    /// Bencoded .torrent for the given layout.
    ///
    /// A single file whose path equals `name` gives a single-file torrent,
    /// anything else a multi-file torrent rooted at `name`.
    pub fn torrent_bytes(name: &str, files: &[(&str, u64)]) -> Vec<u8> {
        let total: u64 = files.iter().map(|(_, size)| size).sum();
        let piece_count = total.div_ceil(PIECE_LENGTH).max(1);
        let pieces = vec![0u8; (piece_count * 20) as usize];

        // Keys in every dictionary are written in sorted order.
        let mut info = Vec::new();
        info.push(b'd');
        if files.len() == 1 && files[0].0 == name {
            bencode_str(&mut info, b"length");
            bencode_int(&mut info, files[0].1);
        } else {
            bencode_str(&mut info, b"files");
            info.push(b'l');
            for (path, size) in files {
                info.push(b'd');
                bencode_str(&mut info, b"length");
                bencode_int(&mut info, *size);
                bencode_str(&mut info, b"path");
                info.push(b'l');
                for part in path.split('/') {
                    bencode_str(&mut info, part.as_bytes());
                }
                info.push(b'e');
                info.push(b'e');
            }
            info.push(b'e');
        }
        bencode_str(&mut info, b"name");
        bencode_str(&mut info, name.as_bytes());
        bencode_str(&mut info, b"piece length");
        bencode_int(&mut info, PIECE_LENGTH);
        bencode_str(&mut info, b"pieces");
        bencode_str(&mut info, &pieces);
        info.push(b'e');

        let mut torrent = Vec::new();
        torrent.push(b'd');
        bencode_str(&mut torrent, b"announce");
        bencode_str(&mut torrent, b"http://tracker.example/announce");
        bencode_str(&mut torrent, b"info");
        torrent.extend_from_slice(&info);
        torrent.push(b'e');
        torrent
    }

    fn bencode_str(out: &mut Vec<u8>, value: &[u8]) {
        out.extend_from_slice(value.len().to_string().as_bytes());
        out.push(b':');
        out.extend_from_slice(value);
    }

    fn bencode_int(out: &mut Vec<u8>, value: u64) {
        out.push(b'i');
        out.extend_from_slice(value.to_string().as_bytes());
        out.push(b'e');
    }
}
