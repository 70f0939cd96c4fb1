//! Filesystem store for matched .torrent files.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as SyncMutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::PersistError;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-_.()\[\] ]").unwrap());

/// Make a string safe to use as a file name.
///
/// Slashes become dashes, anything outside word characters and
/// `-_.()[] ` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced = name.replace('/', "-");
    UNSAFE_CHARS.replace_all(&replaced, "").into_owned()
}

/// Removes a temporary file unless disarmed.
///
/// Covers both error returns and the write future being dropped midway.
struct TempFileGuard {
    path: Option<PathBuf>,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
                }
            }
        }
    }
}

type LockMap = Arc<SyncMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Exclusive hold on one target file name.
///
/// Dropping it releases the lock and forgets the key once no other task
/// holds or waits for it.
#[derive(Debug)]
pub struct KeyLock {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: LockMap,
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Writes .torrent files into a single save directory.
///
/// Files are named `<release_id>-<tracker_id>.torrent`. Writers of the same
/// target are serialized through a per-key lock, and every write goes
/// through a temporary file plus rename so readers never see partial data.
#[derive(Debug)]
pub struct FsTorrentStore {
    save_dir: PathBuf,
    locks: LockMap,
}

impl FsTorrentStore {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            locks: Arc::new(SyncMutex::new(HashMap::new())),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// File name for a release/tracker pair.
    pub fn file_name(release_id: &str, tracker_id: &str) -> String {
        sanitize_file_name(&format!("{}-{}.torrent", release_id, tracker_id))
    }

    /// Full target path for a release/tracker pair.
    pub fn target_path(&self, release_id: &str, tracker_id: &str) -> PathBuf {
        self.save_dir.join(Self::file_name(release_id, tracker_id))
    }

    /// Acquire the write lock for a target file name.
    pub async fn lock(&self, file_name: &str) -> KeyLock {
        let entry = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(file_name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        KeyLock {
            guard: Some(entry.lock_owned().await),
            key: file_name.to_string(),
            locks: self.locks.clone(),
        }
    }

    /// Number of file names with a live lock entry.
    pub fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether a target already exists.
    pub async fn exists(&self, path: &Path) -> Result<bool, PersistError> {
        fs::try_exists(path)
            .await
            .map_err(|e| PersistError::io(path, e))
    }

    /// Create the save directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.save_dir)
            .await
            .map_err(|e| PersistError::io(&self.save_dir, e))
    }

    /// Atomically write `bytes` to `target`.
    ///
    /// The data goes to a uniquely named temporary file in the same
    /// directory, is synced, then renamed over the target.
    pub async fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<(), PersistError> {
        let dir = target.parent().unwrap_or(&self.save_dir);
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PersistError::io(dir, e))?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
        let mut guard = TempFileGuard::new(temp.clone());

        let mut file = fs::File::create(&temp)
            .await
            .map_err(|e| PersistError::io(&temp, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| PersistError::io(&temp, e))?;
        file.sync_all()
            .await
            .map_err(|e| PersistError::io(&temp, e))?;
        drop(file);

        fs::rename(&temp, target)
            .await
            .map_err(|e| PersistError::io(target, e))?;
        guard.disarm();

        debug!(path = %target.display(), bytes = bytes.len(), "Wrote torrent file");
        Ok(())
    }

    /// Names of the .torrent files currently in the save directory.
    pub async fn list_saved(&self) -> Result<Vec<String>, PersistError> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.save_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(PersistError::io(&self.save_dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PersistError::io(&self.save_dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".torrent") && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            sanitize_file_name("Show.Name.S01E01.1080p-GROUP-trackerA.torrent"),
            "Show.Name.S01E01.1080p-GROUP-trackerA.torrent"
        );
        assert_eq!(sanitize_file_name("a/b:c*?.torrent"), "a-bc.torrent");
        assert_eq!(sanitize_file_name("Movie (2020) [x]"), "Movie (2020) [x]");
    }

    #[test]
    fn test_target_path() {
        let store = FsTorrentStore::new("/save");
        assert_eq!(
            store.target_path("Show.Name.S01E01.1080p-GROUP", "trackerA"),
            PathBuf::from("/save/Show.Name.S01E01.1080p-GROUP-trackerA.torrent")
        );
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FsTorrentStore::new(dir.path().join("out"));
        let target = store.target_path("Release", "t");

        store.write_atomic(&target, b"d4:infod4:name1:xee").await.unwrap();
        store.write_atomic(&target, b"second").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let all: Vec<_> = std::fs::read_dir(store.save_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(all, vec!["Release-t.torrent".to_string()]);
        assert_eq!(store.list_saved().await.unwrap(), vec!["Release-t.torrent"]);
    }

    #[tokio::test]
    async fn test_list_saved_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FsTorrentStore::new(dir.path().join("missing"));
        assert!(store.list_saved().await.unwrap().is_empty());
        assert!(!store.exists(&store.target_path("a", "b")).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_serializes_same_key() {
        let store = FsTorrentStore::new("/unused");
        let guard = store.lock("a.torrent").await;

        let mut waiting = task::spawn(store.lock("a.torrent"));
        assert_pending!(waiting.poll());

        // A different key is independent.
        let _other = store.lock("b.torrent").await;

        drop(guard);
        assert!(waiting.is_woken());
        let guard = assert_ready!(waiting.poll());
        assert_eq!(store.tracked_locks(), 2);

        drop(guard);
        drop(waiting);
        drop(_other);
        assert_eq!(store.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_contended() {
        let store = FsTorrentStore::new("/unused");
        let guard = store.lock("a.torrent").await;
        let mut waiting = task::spawn(store.lock("a.torrent"));
        assert_pending!(waiting.poll());

        drop(guard);
        assert_eq!(store.tracked_locks(), 1);
        let guard = assert_ready!(waiting.poll());
        drop(guard);
        assert_eq!(store.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = FsTorrentStore::new(dir.path());
        let target = store.target_path("Release", "t");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let err = store.write_atomic(&target, b"payload").await.unwrap_err();
        assert!(matches!(err, PersistError::Io { ref path, .. } if path == &target));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }
}
