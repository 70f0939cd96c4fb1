//! Candidate scoring and per-tracker selection.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::fingerprint::Fingerprint;
use crate::metrics;
use crate::searcher::Candidate;

use super::config::MatchingConfig;
use super::default_policy::DefaultMatchPolicy;
use super::traits::MatchPolicy;
use super::types::{MatchDecision, MatchResult};

/// Scores candidates for a release through a [`MatchPolicy`].
#[derive(Clone)]
pub struct Matcher {
    policy: Arc<dyn MatchPolicy>,
}

impl Matcher {
    pub fn new(policy: Arc<dyn MatchPolicy>) -> Self {
        Self { policy }
    }

    /// Matcher using [`DefaultMatchPolicy`].
    pub fn with_config(config: MatchingConfig) -> Self {
        Self::new(Arc::new(DefaultMatchPolicy::with_config(config)))
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Score every candidate against the fingerprint.
    ///
    /// A candidate is accepted when it is not disqualified and reaches the
    /// policy threshold. A known size that differs from the release, or a
    /// missing download link, disqualifies whatever the policy says. Candidates from distinct trackers can all be
    /// accepted; within one tracker only the best one stays accepted.
    /// Results are sorted by score, highest first.
    pub fn score(&self, fingerprint: &Fingerprint, candidates: &[Candidate]) -> Vec<MatchResult> {
        let threshold = self.policy.threshold();

        let mut results: Vec<MatchResult> = candidates
            .iter()
            .map(|candidate| {
                let eval = self.policy.evaluate(fingerprint, candidate);
                let disqualification =
                    hard_disqualification(fingerprint, candidate).or(eval.disqualification);
                let (decision, reason) = match disqualification {
                    Some(reason) => (MatchDecision::Disqualified, reason),
                    None if eval.score >= threshold => {
                        (MatchDecision::Accepted, eval.reasoning.join(", "))
                    }
                    None => (
                        MatchDecision::BelowThreshold,
                        format!(
                            "score {:.2} below threshold {:.2}: {}",
                            eval.score,
                            threshold,
                            eval.reasoning.join(", ")
                        ),
                    ),
                };
                MatchResult {
                    candidate: candidate.clone(),
                    release_id: fingerprint.release_id.clone(),
                    score: eval.score,
                    breakdown: eval.breakdown,
                    accepted: decision == MatchDecision::Accepted,
                    decision,
                    reason,
                }
            })
            .collect();

        // Stable sort keeps backend order among equal scores.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut trackers = HashSet::new();
        for result in results.iter_mut().filter(|r| r.accepted) {
            if !trackers.insert(result.candidate.tracker_id.clone()) {
                result.accepted = false;
                result.decision = MatchDecision::Superseded;
                result.reason = format!(
                    "superseded by a higher-scoring candidate from tracker {}",
                    result.candidate.tracker_id
                );
            }
        }

        metrics::CANDIDATES_SCORED.inc_by(results.len() as u64);
        for result in &results {
            metrics::MATCH_DECISIONS
                .with_label_values(&[result.decision.as_str()])
                .inc();
            if result.accepted {
                metrics::ACCEPTED_SCORE.observe(result.score as f64);
            }
            debug!(
                release = %result.release_id,
                tracker = %result.candidate.tracker_id,
                score = result.score,
                decision = result.decision.as_str(),
                reason = %result.reason,
                "Scored candidate"
            );
        }

        results
    }
}

/// Disqualifiers no policy can override.
fn hard_disqualification(fingerprint: &Fingerprint, candidate: &Candidate) -> Option<String> {
    if candidate.download_uri.is_none() {
        return Some("no download link".to_string());
    }
    match candidate.size_bytes {
        Some(size) if size != fingerprint.total_size_bytes => Some(format!(
            "size mismatch ({} vs {} bytes)",
            size, fingerprint.total_size_bytes
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::matcher::{Evaluation, ScoreBreakdown};
    use crate::testing::fixtures;

    const TOTAL: u64 = 1_456_221_312;

    fn show_fingerprint() -> Fingerprint {
        fingerprint(&fixtures::local_release(
            "Show.Name.S01E01.1080p-GROUP",
            &[
                ("Show.Name.S01E01.1080p-GROUP.mkv", TOTAL - 3_000),
                ("Show.Name.S01E01.1080p-GROUP.nfo", 1_000),
                ("Sample/sample.mkv", 2_000),
            ],
        ))
    }

    #[test]
    fn test_zero_candidates_yield_empty_result() {
        let matcher = Matcher::with_config(MatchingConfig::default());
        assert!(matcher.score(&show_fingerprint(), &[]).is_empty());
    }

    #[test]
    fn test_show_scenario() {
        let matcher = Matcher::with_config(MatchingConfig::default());
        let candidates = vec![
            fixtures::candidate("jackett", "trackerA", "Show Name S01E01 1080p GROUP", Some(TOTAL)),
            fixtures::candidate("jackett", "trackerB", "Show Name S01E01 1080p GROUP", Some(TOTAL)),
            fixtures::candidate("jackett", "trackerA", "Show Name S01E01 720p GROUP", Some(812_003_000)),
        ];

        let results = matcher.score(&show_fingerprint(), &candidates);
        assert_eq!(results.len(), 3);

        let accepted: Vec<_> = results.iter().filter(|r| r.accepted).collect();
        assert_eq!(accepted.len(), 2);
        let trackers: HashSet<_> = accepted.iter().map(|r| r.candidate.tracker_id.as_str()).collect();
        assert_eq!(trackers, HashSet::from(["trackerA", "trackerB"]));

        let rejected = results.iter().find(|r| !r.accepted).unwrap();
        assert_eq!(rejected.candidate.size_bytes, Some(812_003_000));
        assert_eq!(rejected.decision, MatchDecision::Disqualified);
        assert!(rejected.reason.starts_with("size mismatch"));
        assert_eq!(rejected.release_id, "Show.Name.S01E01.1080p-GROUP");
    }

    #[test]
    fn test_same_tracker_keeps_only_best() {
        let matcher = Matcher::with_config(MatchingConfig::default());
        let candidates = vec![
            fixtures::candidate("jackett", "trackerA", "Show Name S01E01", None),
            fixtures::candidate("jackett", "trackerA", "Show Name S01E01 1080p GROUP", Some(TOTAL)),
        ];

        let results = matcher.score(&show_fingerprint(), &candidates);
        assert!(results[0].accepted);
        assert_eq!(results[0].candidate.size_bytes, Some(TOTAL));
        assert!(!results[1].accepted);
        assert_eq!(results[1].decision, MatchDecision::Superseded);
    }

    #[test]
    fn test_results_sorted_by_score() {
        let matcher = Matcher::with_config(MatchingConfig::default());
        let candidates = vec![
            fixtures::candidate("jackett", "a", "Unrelated", Some(TOTAL)),
            fixtures::candidate("jackett", "b", "Show Name S01E01 1080p GROUP", Some(TOTAL)),
            fixtures::candidate("jackett", "c", "Show Name", None),
        ];

        let results = matcher.score(&show_fingerprint(), &candidates);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(results[0].candidate.tracker_id, "b");
    }

    #[test]
    fn test_below_threshold_reason() {
        let matcher = Matcher::with_config(MatchingConfig {
            threshold: 0.99,
            ..MatchingConfig::default()
        });
        let results = matcher.score(
            &show_fingerprint(),
            &[fixtures::candidate("jackett", "a", "Show Name S01E01 1080p GROUP", None)],
        );

        assert_eq!(results[0].decision, MatchDecision::BelowThreshold);
        assert!(results[0].reason.starts_with("score 0.80 below threshold 0.99"));
    }

    struct AcceptAll;

    impl MatchPolicy for AcceptAll {
        fn name(&self) -> &str {
            "accept-all"
        }

        fn threshold(&self) -> f32 {
            0.0
        }

        fn evaluate(&self, _fingerprint: &Fingerprint, _candidate: &Candidate) -> Evaluation {
            Evaluation {
                score: 0.1,
                breakdown: ScoreBreakdown::default(),
                disqualification: None,
                reasoning: vec!["anything goes".to_string()],
            }
        }
    }

    #[test]
    fn test_custom_policy_is_used() {
        let matcher = Matcher::new(Arc::new(AcceptAll));
        assert_eq!(matcher.policy_name(), "accept-all");

        let results = matcher.score(
            &show_fingerprint(),
            &[fixtures::candidate("jackett", "a", "Whatever", None)],
        );
        assert!(results[0].accepted);
        assert_eq!(results[0].reason, "anything goes");
    }

    #[test]
    fn test_size_mismatch_rejected_under_any_policy() {
        let matcher = Matcher::new(Arc::new(AcceptAll));
        let results = matcher.score(
            &show_fingerprint(),
            &[fixtures::candidate(
                "jackett",
                "a",
                "Show Name S01E01 1080p GROUP",
                Some(TOTAL + 1),
            )],
        );

        assert!(!results[0].accepted);
        assert_eq!(results[0].decision, MatchDecision::Disqualified);
        assert_eq!(
            results[0].reason,
            format!("size mismatch ({} vs {} bytes)", TOTAL + 1, TOTAL)
        );
    }

    #[test]
    fn test_missing_link_rejected_under_any_policy() {
        let matcher = Matcher::new(Arc::new(AcceptAll));
        let mut candidate = fixtures::candidate("jackett", "a", "Show Name S01E01", Some(TOTAL));
        candidate.download_uri = None;

        let results = matcher.score(&show_fingerprint(), &[candidate]);
        assert!(!results[0].accepted);
        assert_eq!(results[0].decision, MatchDecision::Disqualified);
        assert_eq!(results[0].reason, "no download link");
    }
}
