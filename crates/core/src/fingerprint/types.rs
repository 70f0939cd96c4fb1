use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::name::{parse_release_name, ParsedName};
use super::normalize::{normalize_file_name, normalize_title, tokenize};
use crate::release::LocalRelease;

/// Coarse layout signature: file count plus a size distribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub file_count: usize,
    pub largest_file_bytes: u64,
    /// Number of files per power-of-two size bucket (`floor(log2(size))`,
    /// zero-byte files land in bucket 0).
    pub size_buckets: BTreeMap<u8, usize>,
}

impl Shape {
    pub fn from_sizes(sizes: &[u64]) -> Self {
        let mut size_buckets = BTreeMap::new();
        for &size in sizes {
            *size_buckets.entry(size_bucket(size)).or_insert(0) += 1;
        }
        Self {
            file_count: sizes.len(),
            largest_file_bytes: sizes.iter().copied().max().unwrap_or(0),
            size_buckets,
        }
    }

    /// Similarity in `0.0..=1.0`, half file-count agreement and half
    /// bucket overlap.
    pub fn similarity(&self, other: &Shape) -> f32 {
        if self.file_count == 0 && other.file_count == 0 {
            return 1.0;
        }
        if self.file_count == 0 || other.file_count == 0 {
            return 0.0;
        }

        let count_score =
            self.file_count.min(other.file_count) as f32 / self.file_count.max(other.file_count) as f32;

        let overlap: usize = self
            .size_buckets
            .iter()
            .map(|(bucket, n)| (*n).min(other.size_buckets.get(bucket).copied().unwrap_or(0)))
            .sum();
        let bucket_score = overlap as f32 / self.file_count.max(other.file_count) as f32;

        count_score * 0.5 + bucket_score * 0.5
    }
}

fn size_bucket(size: u64) -> u8 {
    if size == 0 {
        0
    } else {
        (63 - size.leading_zeros()) as u8
    }
}

/// Comparable content signature of a [`LocalRelease`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub release_id: String,
    pub normalized_title: String,
    pub title_tokens: Vec<String>,
    pub parsed: ParsedName,
    /// Case/whitespace-normalized relative paths.
    pub file_names: BTreeSet<String>,
    /// File size multiset, ascending.
    pub file_sizes: Vec<u64>,
    pub total_size_bytes: u64,
    pub shape: Shape,
    /// Lowercase hex SHA-256 over the sorted size multiset.
    pub layout_digest: String,
}

impl Fingerprint {
    pub fn is_empty(&self) -> bool {
        self.file_sizes.is_empty()
    }

    /// Whether `sizes` is exactly this release's size multiset.
    pub fn same_sizes(&self, sizes: &[u64]) -> bool {
        let mut sorted = sizes.to_vec();
        sorted.sort_unstable();
        sorted == self.file_sizes
    }
}

/// Build the fingerprint of a release. Never fails; an empty release gives a
/// zero-file fingerprint.
pub fn fingerprint(release: &LocalRelease) -> Fingerprint {
    let file_names = release
        .files()
        .iter()
        .map(|f| normalize_file_name(&f.relative_path))
        .collect();

    let mut file_sizes: Vec<u64> = release.files().iter().map(|f| f.size_bytes).collect();
    file_sizes.sort_unstable();

    Fingerprint {
        release_id: release.id().to_string(),
        normalized_title: normalize_title(release.id()),
        title_tokens: tokenize(release.id()),
        parsed: parse_release_name(release.id()),
        file_names,
        shape: Shape::from_sizes(&file_sizes),
        layout_digest: layout_digest(&file_sizes),
        total_size_bytes: release.total_size_bytes(),
        file_sizes,
    }
}

fn layout_digest(sorted_sizes: &[u64]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((sorted_sizes.len() as u64).to_le_bytes());
    for size in sorted_sizes {
        hasher.update(size.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}
