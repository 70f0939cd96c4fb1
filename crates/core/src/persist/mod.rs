//! Fetch & persist: saves accepted matches as .torrent files.
//!
//! The save path doubles as the record of what was already matched: a file
//! named `<release_id>-<tracker_id>.torrent` means the pair is done.

mod error;
mod history;
mod persister;
mod store;
mod types;

pub use error::{HistoryError, PersistError};
pub use history::SearchHistory;
pub use persister::TorrentPersister;
pub use store::{sanitize_file_name, FsTorrentStore, KeyLock};
pub use types::{PersistOutcome, SavedTorrentRecord, SkipReason};
