//! Content fingerprinting.
//!
//! A [`Fingerprint`] summarizes a local release so it can be compared with
//! indexer results: normalized title, parsed name hints, the normalized file
//! name set, the size multiset and a coarse layout shape.

mod name;
mod normalize;
mod query;
mod types;

pub use name::{parse_release_name, ParsedName, ReleaseKind};
pub use normalize::{detect_resolution, normalize_file_name, normalize_title, tokenize};
pub use query::build_query;
pub use types::{fingerprint, Fingerprint, Shape};
