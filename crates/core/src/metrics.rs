//! Prometheus metrics for the cross-seed pipeline.
//!
//! This module provides metrics for:
//! - Releases (outcome per release)
//! - Indexer backends (searches, retries, downloads)
//! - Matching (candidates scored, decisions, accepted scores)
//! - Persistence (saved / skipped / failed torrents)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// =============================================================================
// Releases
// =============================================================================

/// Releases processed total by outcome.
pub static RELEASES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crossseed_releases_processed_total",
            "Total releases processed",
        ),
        &["outcome"], // "matched", "unmatched", "skipped", "failed"
    )
    .unwrap()
});

// =============================================================================
// Indexer backends
// =============================================================================

/// Search requests total by backend and result.
pub static SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crossseed_searches_total", "Total backend search requests"),
        &["backend", "result"], // result: "success", "error", "disabled"
    )
    .unwrap()
});

/// Retries performed after transient backend errors.
pub static BACKEND_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crossseed_backend_retries_total",
            "Total retries after transient backend errors",
        ),
        &["backend"],
    )
    .unwrap()
});

/// Torrent downloads total by backend and result.
pub static TORRENT_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crossseed_torrent_fetches_total",
            "Total .torrent download requests",
        ),
        &["backend", "result"],
    )
    .unwrap()
});

// =============================================================================
// Matching
// =============================================================================

/// Candidates scored total.
pub static CANDIDATES_SCORED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("crossseed_candidates_scored_total", "Total candidates scored").unwrap()
});

/// Match decisions total.
pub static MATCH_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crossseed_match_decisions_total", "Total match decisions"),
        &["decision"], // "accepted", "below_threshold", "disqualified", "superseded"
    )
    .unwrap()
});

/// Scores of accepted matches.
pub static ACCEPTED_SCORE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "crossseed_accepted_match_score",
            "Distribution of accepted match scores",
        )
        .buckets(vec![0.75, 0.8, 0.85, 0.9, 0.95, 1.0]),
    )
    .unwrap()
});

// =============================================================================
// Persistence
// =============================================================================

/// Torrents persisted total by result.
pub static TORRENTS_PERSISTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crossseed_torrents_persisted_total",
            "Total persist attempts by result",
        ),
        &["result"], // "saved", "already_saved", "previously_grabbed", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RELEASES_PROCESSED.clone()),
        Box::new(SEARCHES.clone()),
        Box::new(BACKEND_RETRIES.clone()),
        Box::new(TORRENT_FETCHES.clone()),
        Box::new(CANDIDATES_SCORED.clone()),
        Box::new(MATCH_DECISIONS.clone()),
        Box::new(ACCEPTED_SCORE.clone()),
        Box::new(TORRENTS_PERSISTED.clone()),
    ]
}

/// Register every core metric in `registry`.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}

/// Encode a registry as Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_encode() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();

        RELEASES_PROCESSED.with_label_values(&["matched"]).inc();
        SEARCHES.with_label_values(&["jackett", "success"]).inc();
        CANDIDATES_SCORED.inc();
        ACCEPTED_SCORE.observe(0.9);

        let output = encode_metrics(&registry).unwrap();
        assert!(output.contains("crossseed_releases_processed_total"));
        assert!(output.contains("crossseed_searches_total"));
        assert!(output.contains("crossseed_candidates_scored_total"));
        assert!(output.contains("crossseed_accepted_match_score"));
        assert!(output.contains("# HELP"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();
        assert!(register_metrics(&registry).is_err());
    }
}
