//! Default (heuristic-based) matching policy.
//!
//! Scores candidates by title similarity and exact size agreement, refined
//! by file layout when the backend lists files. Works entirely offline.

use std::collections::HashSet;

use crate::fingerprint::{detect_resolution, tokenize, Fingerprint, Shape};
use crate::searcher::Candidate;

use super::config::MatchingConfig;
use super::traits::MatchPolicy;
use super::types::{Evaluation, ScoreBreakdown};

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "in", "on", "at", "to", "for", "of", "with", "by", "from",
];

/// Heuristic matching policy.
///
/// Scores candidates by:
/// 1. Title similarity to the release's normalized title
/// 2. Exact total size (a known, different size disqualifies)
/// 3. File layout shape, when the candidate lists files
/// 4. Resolution conflicts (penalty)
pub struct DefaultMatchPolicy {
    config: MatchingConfig,
}

impl DefaultMatchPolicy {
    /// Create a new policy with default config.
    pub fn new() -> Self {
        Self {
            config: MatchingConfig::default(),
        }
    }

    /// Create a new policy with custom config.
    pub fn with_config(config: MatchingConfig) -> Self {
        Self { config }
    }

    fn keywords<I: IntoIterator<Item = String>>(tokens: I) -> HashSet<String> {
        tokens
            .into_iter()
            .filter(|t| t.len() > 1 || t.chars().all(|c| c.is_ascii_digit()))
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
            .collect()
    }

    fn is_partial_match(a: &str, b: &str) -> bool {
        a.len() >= 3 && b.len() >= 3 && (a.contains(b) || b.contains(a))
    }

    /// Calculate title similarity score (0.0-1.0).
    ///
    /// Keyword coverage of the release title, with half credit for partial
    /// and 0.8 for fuzzy matches, blended with how much of the candidate
    /// title is accounted for.
    fn title_similarity(&self, fingerprint: &Fingerprint, title: &str) -> f32 {
        let reference = Self::keywords(fingerprint.title_tokens.iter().cloned());
        let candidate = Self::keywords(tokenize(title));

        if reference.is_empty() {
            return 0.5; // Nothing to match against
        }
        if candidate.is_empty() {
            return 0.0;
        }

        let matches = reference.iter().filter(|kw| candidate.contains(*kw)).count();

        let partial_matches = reference
            .iter()
            .filter(|kw| {
                !candidate.contains(*kw) && candidate.iter().any(|ck| Self::is_partial_match(kw, ck))
            })
            .count();

        let fuzzy_matches = reference
            .iter()
            .filter(|kw| {
                !candidate.contains(*kw)
                    && !candidate.iter().any(|ck| Self::is_partial_match(kw, ck))
                    && candidate.iter().any(|ck| Self::is_fuzzy_match(kw, ck))
            })
            .count();

        let total_score = matches as f32 + (partial_matches as f32 * 0.5) + (fuzzy_matches as f32 * 0.8);
        let coverage = (total_score / reference.len() as f32).min(1.0);

        // The release group shows up as a plain token in spaced titles.
        let group = fingerprint.parsed.group.as_ref().map(|g| g.to_lowercase());
        let accounted = candidate
            .iter()
            .filter(|ck| {
                reference.contains(*ck)
                    || group.as_deref() == Some(ck.as_str())
                    || reference
                        .iter()
                        .any(|kw| Self::is_partial_match(kw, ck) || Self::is_fuzzy_match(kw, ck))
            })
            .count();
        let precision = accounted as f32 / candidate.len() as f32;

        coverage * 0.85 + precision * 0.15
    }

    /// Check if two strings are fuzzy matches (small edit distance).
    fn is_fuzzy_match(a: &str, b: &str) -> bool {
        let len_diff = (a.len() as i32 - b.len() as i32).abs();
        if len_diff > 2 {
            return false;
        }

        // Short words produce too many false positives
        if a.len() < 4 || b.len() < 4 {
            return false;
        }

        // Numbers must match exactly (years, episode markers)
        if a.chars().any(|c| c.is_ascii_digit()) || b.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }

        let distance = Self::levenshtein_distance(a, b);
        let threshold = if a.len() >= 8 { 2 } else { 1 };
        distance <= threshold
    }

    /// Calculate Levenshtein edit distance between two strings.
    fn levenshtein_distance(a: &str, b: &str) -> usize {
        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();

        if a_chars.is_empty() {
            return b_chars.len();
        }
        if b_chars.is_empty() {
            return a_chars.len();
        }

        // Single-row dynamic programming
        let mut row: Vec<usize> = (0..=b_chars.len()).collect();
        for (i, a_char) in a_chars.iter().enumerate() {
            let mut diagonal = row[0];
            row[0] = i + 1;
            for (j, b_char) in b_chars.iter().enumerate() {
                let cost = if a_char == b_char { 0 } else { 1 };
                let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
                diagonal = row[j + 1];
                row[j + 1] = next;
            }
        }
        row[b_chars.len()]
    }

    fn describe_title(score: f32) -> &'static str {
        if score >= 0.9 {
            "excellent title match"
        } else if score >= 0.7 {
            "good title match"
        } else if score >= 0.5 {
            "partial title match"
        } else if score >= 0.3 {
            "weak title match"
        } else {
            "title doesn't match well"
        }
    }
}

impl Default for DefaultMatchPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchPolicy for DefaultMatchPolicy {
    fn name(&self) -> &str {
        "default"
    }

    fn threshold(&self) -> f32 {
        self.config.threshold
    }

    fn evaluate(&self, fingerprint: &Fingerprint, candidate: &Candidate) -> Evaluation {
        let mut reasoning = Vec::new();
        let mut disqualification = None;
        let mut penalty = 0.0f32;

        if candidate.download_uri.is_none() {
            disqualification = Some("no download link".to_string());
        }

        let title = self.title_similarity(fingerprint, &candidate.title);
        reasoning.push(Self::describe_title(title).to_string());

        let size = match candidate.size_bytes {
            Some(size) if size == fingerprint.total_size_bytes => {
                reasoning.push("exact size match".to_string());
                1.0
            }
            Some(size) => {
                let reason = format!(
                    "size mismatch ({} vs {} bytes)",
                    size, fingerprint.total_size_bytes
                );
                reasoning.push(reason.clone());
                disqualification.get_or_insert(reason);
                0.0
            }
            None => {
                reasoning.push("size unknown".to_string());
                self.config.unknown_size_score
            }
        };

        let shape = match &candidate.files {
            Some(files) if !files.is_empty() => {
                let sizes: Vec<u64> = files.iter().map(|f| f.size_bytes).collect();
                let score = if fingerprint.same_sizes(&sizes) {
                    reasoning.push("file layout identical".to_string());
                    1.0
                } else {
                    reasoning.push(format!(
                        "file layout differs ({} vs {} files)",
                        sizes.len(),
                        fingerprint.shape.file_count
                    ));
                    fingerprint.shape.similarity(&Shape::from_sizes(&sizes))
                };
                Some(score)
            }
            _ => None,
        };

        if let (Some(ours), Some(theirs)) = (
            fingerprint.parsed.resolution.as_deref(),
            detect_resolution(&candidate.title),
        ) {
            if ours != theirs {
                penalty += self.config.resolution_conflict_penalty;
                reasoning.push(format!("resolution conflict ({} vs {})", theirs, ours));
            }
        }

        let weight_sum = self.config.title_weight + self.config.size_weight;
        let base = if weight_sum > 0.0 {
            (title * self.config.title_weight + size * self.config.size_weight) / weight_sum
        } else {
            0.0
        };
        let blended = match shape {
            Some(shape) => base * (1.0 - self.config.shape_weight) + shape * self.config.shape_weight,
            None => base,
        };

        if let Some(reason) = &disqualification {
            // Keep the disqualifying reason first.
            reasoning.retain(|r| r != reason);
            reasoning.insert(0, reason.clone());
        }

        Evaluation {
            score: (blended - penalty).clamp(0.0, 1.0),
            breakdown: ScoreBreakdown {
                title,
                size,
                shape,
                penalty,
            },
            disqualification,
            reasoning,
        }
    }
}
