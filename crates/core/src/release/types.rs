//! Release data types.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single payload file inside a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the release root, `/`-separated.
    /// For single-file releases this is the file name.
    pub relative_path: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            size_bytes,
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// A release found in the parse directory.
///
/// Immutable once constructed. Files are kept sorted by relative path so
/// everything derived from a release is independent of directory order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRelease {
    id: String,
    path: PathBuf,
    files: Vec<FileEntry>,
    total_size_bytes: u64,
}

impl LocalRelease {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, mut files: Vec<FileEntry>) -> Self {
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        let total_size_bytes = files.iter().map(|f| f.size_bytes).sum();
        Self {
            id: id.into(),
            path: path.into(),
            files,
            total_size_bytes,
        }
    }

    /// Release identifier (the file or directory name).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
