//! Parse-directory scanning.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::debug;

use super::types::{FileEntry, LocalRelease};

/// Errors that can occur while reading a release from disk.
#[derive(Debug, Error)]
pub enum ScanError {
    /// An entry (or something below it) could not be read.
    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The parse directory is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Entry is neither a regular file nor a directory.
    #[error("Unsupported entry type: {0}")]
    Unsupported(PathBuf),
}

impl ScanError {
    fn unreadable(path: &Path, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// List the top-level entries of the parse directory, sorted by name.
///
/// Hidden entries (names starting with `.`) are ignored.
pub async fn list_release_paths(parse_dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let meta = fs::metadata(parse_dir)
        .await
        .map_err(|e| ScanError::unreadable(parse_dir, e))?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(parse_dir.to_path_buf()));
    }

    let mut entries = fs::read_dir(parse_dir)
        .await
        .map_err(|e| ScanError::unreadable(parse_dir, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ScanError::unreadable(parse_dir, e))?
    {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }

    paths.sort();
    debug!(dir = %parse_dir.display(), entries = paths.len(), "Listed parse directory");
    Ok(paths)
}

/// Read one release (a file or a directory tree) into a [`LocalRelease`].
///
/// Symlinks are followed; a dangling link anywhere in the tree makes the
/// whole release unreadable, since its total size would be wrong.
pub async fn read_release(path: &Path) -> Result<LocalRelease, ScanError> {
    let id = release_id(path);
    let meta = fs::metadata(path)
        .await
        .map_err(|e| ScanError::unreadable(path, e))?;

    if meta.is_file() {
        return Ok(LocalRelease::new(
            id.clone(),
            path,
            vec![FileEntry::new(id, meta.len())],
        ));
    }

    if !meta.is_dir() {
        return Err(ScanError::Unsupported(path.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut pending: Vec<(PathBuf, String)> = vec![(path.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| ScanError::unreadable(&dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScanError::unreadable(&dir, e))?
        {
            let entry_path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };

            let entry_meta = fs::metadata(&entry_path)
                .await
                .map_err(|e| ScanError::unreadable(&entry_path, e))?;

            if entry_meta.is_dir() {
                pending.push((entry_path, relative));
            } else if entry_meta.is_file() {
                files.push(FileEntry::new(relative, entry_meta.len()));
            } else {
                return Err(ScanError::Unsupported(entry_path));
            }
        }
    }

    Ok(LocalRelease::new(id, path, files))
}

fn release_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(path: &Path, len: usize) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, vec![0u8; len]).unwrap();
    }

    #[tokio::test]
    async fn test_read_single_file_release() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Movie.2020.1080p.mkv");
        write_file(&file, 1234);

        let release = read_release(&file).await.unwrap();
        assert_eq!(release.id(), "Movie.2020.1080p.mkv");
        assert_eq!(release.files().len(), 1);
        assert_eq!(release.files()[0].relative_path, "Movie.2020.1080p.mkv");
        assert_eq!(release.total_size_bytes(), 1234);
    }

    #[tokio::test]
    async fn test_read_directory_release_recurses() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("Album-GROUP");
        write_file(&root.join("01.flac"), 100);
        write_file(&root.join("02.flac"), 200);
        write_file(&root.join("Scans/cover.jpg"), 50);

        let release = read_release(&root).await.unwrap();
        assert_eq!(release.id(), "Album-GROUP");
        assert_eq!(release.total_size_bytes(), 350);

        let paths: Vec<_> = release
            .files()
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["01.flac", "02.flac", "Scans/cover.jpg"]);
    }

    #[tokio::test]
    async fn test_read_empty_directory_release() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("Empty");
        std::fs::create_dir(&root).unwrap();

        let release = read_release(&root).await.unwrap();
        assert!(release.is_empty());
        assert_eq!(release.total_size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_read_missing_release_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = read_release(&dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, ScanError::Unreadable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_makes_release_unreadable() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("Linked");
        write_file(&root.join("real.mkv"), 10);
        std::os::unix::fs::symlink(dir.path().join("gone.mkv"), root.join("link.mkv")).unwrap();

        let err = read_release(&root).await.unwrap_err();
        assert!(matches!(err, ScanError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_list_release_paths_sorted_and_skips_hidden() {
        let dir = TempDir::new().unwrap();
        write_file(&dir.path().join("b.mkv"), 1);
        write_file(&dir.path().join("a/file.mkv"), 1);
        write_file(&dir.path().join(".hidden"), 1);

        let paths = list_release_paths(dir.path()).await.unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b.mkv"]);
    }

    #[tokio::test]
    async fn test_list_release_paths_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.mkv");
        write_file(&file, 1);

        let err = list_release_paths(&file).await.unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }
}
