//! Local release discovery.
//!
//! Every top-level entry of the parse directory (file or directory) is one
//! release. A release is described by its sorted file list and total size;
//! nothing here reads payload bytes.

mod scanner;
mod types;

pub use scanner::{list_release_paths, read_release, ScanError};
pub use types::{FileEntry, LocalRelease};
