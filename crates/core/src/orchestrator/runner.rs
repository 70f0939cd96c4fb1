//! Release orchestrator implementation.
//!
//! A producer feeds release paths into a bounded queue and a fixed pool of
//! workers drains it. Each release runs its stages sequentially:
//! - Scan: read the release from disk
//! - Fingerprint + query: derive a search from the release name
//! - Search: fan out to every active backend
//! - Score: rank candidates, pick the best per tracker
//! - Persist: fetch and save each accepted match

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{Config, PathsConfig};
use crate::fingerprint::{build_query, fingerprint};
use crate::matcher::Matcher;
use crate::metrics;
use crate::persist::{FsTorrentStore, PersistOutcome, SearchHistory, TorrentPersister};
use crate::release::{list_release_paths, read_release};
use crate::searcher::{IndexerClient, IndexerError};

use super::config::OrchestratorConfig;
use super::types::{
    CancelToken, ErrorKind, FailureRecord, MatchReport, OrchestratorError, ReleaseOutcome,
    ReleaseReport, ReleaseState, RunSummary, Stage,
};

/// Everything a worker needs to take one release through the pipeline.
struct ReleasePipeline {
    client: Arc<IndexerClient>,
    matcher: Matcher,
    persister: TorrentPersister,
    history: Option<Arc<SearchHistory>>,
    ignore_searched: bool,
}

impl ReleasePipeline {
    async fn process(&self, path: &Path, halt: &CancelToken) -> ReleaseReport {
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut report = ReleaseReport::new(id);

        self.run_stages(path, halt, &mut report).await;

        metrics::RELEASES_PROCESSED
            .with_label_values(&[report.outcome.as_str()])
            .inc();
        info!(
            release = %report.release_id,
            outcome = report.outcome.as_str(),
            candidates = report.candidates,
            matches = report.matches.len(),
            "Release processed"
        );
        report
    }

    async fn run_stages(&self, path: &Path, halt: &CancelToken, report: &mut ReleaseReport) {
        let release = match read_release(path).await {
            Ok(release) => release,
            Err(e) => {
                warn!(release = %report.release_id, error = %e, "Failed to read release");
                fail(report, Stage::Scan, ErrorKind::LocalRead, e.to_string());
                return;
            }
        };

        if release.is_empty() || release.total_size_bytes() == 0 {
            skip(report, "release has no data");
            return;
        }

        if let Some(history) = &self.history {
            if !self.ignore_searched && history.was_searched(release.id()).await {
                skip(report, "searched in an earlier run");
                return;
            }
        }

        let fp = fingerprint(&release);
        report.state = ReleaseState::Fingerprinted;

        let Some(query) = build_query(&fp) else {
            skip(report, "no title in release name");
            return;
        };

        let outcome = match self.client.search(&query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if matches!(e, IndexerError::AllBackendsExhausted) {
                    error!(release = %report.release_id, "No backend left, halting dispatch");
                    halt.cancel();
                }
                fail(report, Stage::Query, e.kind(), e.to_string());
                return;
            }
        };

        report.backend_failures = outcome.failures.clone();
        if outcome.all_failed() {
            let kind = outcome.failures[0].kind;
            let messages: Vec<String> = outcome
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.backend, f.message))
                .collect();
            fail(
                report,
                Stage::Query,
                kind,
                format!("every backend failed ({})", messages.join("; ")),
            );
            return;
        }

        report.state = ReleaseState::Queried;
        report.candidates = outcome.candidates.len();
        // Only a pass where every backend answered is final.
        let complete_search = outcome.failures.is_empty();

        let accepted: Vec<_> = self
            .matcher
            .score(&fp, &outcome.candidates)
            .into_iter()
            .filter(|r| r.accepted)
            .collect();
        report.state = ReleaseState::Scored;

        if accepted.is_empty() {
            report.outcome = ReleaseOutcome::Unmatched;
            if complete_search {
                self.mark_searched(release.id()).await;
            }
            return;
        }

        for result in &accepted {
            let tracker_id = result.candidate.tracker_id.clone();
            let mut entry = MatchReport {
                tracker_id: tracker_id.clone(),
                title: result.candidate.title.clone(),
                score: result.score,
                outcome: String::new(),
                kind: None,
                path: None,
                message: result.reason.clone(),
            };

            match self.persister.persist(result, &release).await {
                Ok(PersistOutcome::Saved(record)) => {
                    entry.outcome = "saved".to_string();
                    entry.path = Some(record.path);
                }
                Ok(PersistOutcome::Skipped(reason)) => {
                    entry.outcome = "skipped".to_string();
                    entry.kind = Some(ErrorKind::PersistConflict);
                    entry.path = Some(
                        self.persister
                            .store()
                            .target_path(&report.release_id, &tracker_id),
                    );
                    entry.message = reason.as_str().to_string();
                }
                Err(e) => {
                    warn!(
                        release = %report.release_id,
                        tracker = %tracker_id,
                        error = %e,
                        "Failed to persist match"
                    );
                    entry.outcome = "failed".to_string();
                    entry.kind = Some(e.kind());
                    entry.message = e.to_string();
                    report.failures.push(FailureRecord {
                        release_id: report.release_id.clone(),
                        stage: Stage::Persist,
                        kind: e.kind(),
                        message: format!("{}: {}", tracker_id, e),
                    });
                }
            }
            report.matches.push(entry);
        }

        if !report.failures.is_empty() {
            report.state = ReleaseState::Errored;
            report.outcome = ReleaseOutcome::Failed;
            return;
        }

        report.state = ReleaseState::Persisted;
        if report.matches.iter().any(|m| m.outcome == "saved") {
            report.outcome = ReleaseOutcome::Matched;
        } else {
            skip(report, "already saved");
        }
        if complete_search {
            self.mark_searched(release.id()).await;
        }
    }

    async fn mark_searched(&self, release_id: &str) {
        if let Some(history) = &self.history {
            history.mark_searched(release_id).await;
        }
    }
}

fn fail(report: &mut ReleaseReport, stage: Stage, kind: ErrorKind, message: String) {
    report.state = ReleaseState::Errored;
    report.outcome = ReleaseOutcome::Failed;
    report.failures.push(FailureRecord {
        release_id: report.release_id.clone(),
        stage,
        kind,
        message,
    });
}

fn skip(report: &mut ReleaseReport, reason: &str) {
    debug!(release = %report.release_id, reason, "Skipping release");
    report.outcome = ReleaseOutcome::Skipped;
    report.skip_reason = Some(reason.to_string());
}

/// Drives every release in the parse directory through the matching pipeline.
pub struct CrossSeedOrchestrator {
    config: OrchestratorConfig,
    parse_dir: PathBuf,
    single_release: bool,
    client: Arc<IndexerClient>,
    matcher: Matcher,
    persister: TorrentPersister,
    history: Option<Arc<SearchHistory>>,
    ignore_searched: bool,
    clock: Arc<dyn Clock>,
}

impl CrossSeedOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        paths: &PathsConfig,
        client: Arc<IndexerClient>,
        matcher: Matcher,
        persister: TorrentPersister,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            parse_dir: paths.parse_dir.clone(),
            single_release: paths.single_release,
            client,
            matcher,
            persister,
            history: None,
            ignore_searched: false,
            clock,
        }
    }

    /// Skip releases searched in earlier runs (unless `ignore_searched`)
    /// and torrents grabbed before.
    pub fn with_history(mut self, history: Arc<SearchHistory>, ignore_searched: bool) -> Self {
        self.persister = self.persister.with_history(history.clone());
        self.history = Some(history);
        self.ignore_searched = ignore_searched;
        self
    }

    /// Wire up backends, matcher, store and history from configuration.
    pub async fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, OrchestratorError> {
        let client = IndexerClient::from_config(&config.backends, config.retry.clone(), clock.clone())?;
        if client.backend_count() == 0 {
            return Err(OrchestratorError::NoBackends);
        }
        let client = Arc::new(client);

        let store = Arc::new(FsTorrentStore::new(&config.paths.save_path));
        let persister = TorrentPersister::new(
            client.clone(),
            store,
            config.matching.verify_torrent_size,
        );

        let orchestrator = Self::new(
            config.orchestrator.clone(),
            &config.paths,
            client,
            Matcher::with_config(config.matching.clone()),
            persister,
            clock,
        );

        if !config.history.enabled {
            return Ok(orchestrator);
        }
        let path = config.history.resolve_path(&config.paths.save_path);
        let history = SearchHistory::load(path).await?;
        Ok(orchestrator.with_history(Arc::new(history), config.history.ignore_searched))
    }

    pub fn client(&self) -> &Arc<IndexerClient> {
        &self.client
    }

    /// Process every release once and summarize.
    ///
    /// Cancelling `cancel` stops dispatch; releases already picked up by a
    /// worker run to completion.
    pub async fn run(&self, cancel: CancelToken) -> Result<RunSummary, OrchestratorError> {
        if self.client.active_backend_count() == 0 {
            return Err(OrchestratorError::NoBackends);
        }

        let started_at = Utc::now();
        let paths = if self.single_release {
            vec![self.parse_dir.clone()]
        } else {
            list_release_paths(&self.parse_dir)
                .await
                .map_err(OrchestratorError::ParseDirUnreadable)?
        };
        let releases_found = paths.len();
        let workers = self.config.workers.max(1);

        info!(
            parse_dir = %self.parse_dir.display(),
            releases = releases_found,
            workers,
            policy = self.matcher.policy_name(),
            "Starting cross-seed run"
        );

        // Set when every backend is gone; stops dispatch like a cancel.
        let halt = CancelToken::new();
        let (tx, rx) = mpsc::channel::<PathBuf>(self.config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let producer = {
            let cancel = cancel.clone();
            let halt = halt.clone();
            tokio::spawn(async move {
                for path in paths {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            info!("Dispatch cancelled");
                            break;
                        }
                        _ = halt.cancelled() => break,
                        sent = tx.send(path) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        let pipeline = Arc::new(ReleasePipeline {
            client: self.client.clone(),
            matcher: self.matcher.clone(),
            persister: self.persister.clone(),
            history: self.history.clone(),
            ignore_searched: self.ignore_searched,
        });
        let delay = Duration::from_millis(self.config.delay_between_releases_ms);

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    rx.clone(),
                    pipeline.clone(),
                    cancel.clone(),
                    halt.clone(),
                    self.clock.clone(),
                    delay,
                ))
            })
            .collect();
        drop(rx);

        let mut reports = Vec::with_capacity(releases_found);
        for joined in join_all(handles).await {
            match joined {
                Ok(mut worker_reports) => reports.append(&mut worker_reports),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }
        if let Err(e) = producer.await {
            error!(error = %e, "Producer task failed");
        }

        if let Some(history) = &self.history {
            if let Err(e) = history.save().await {
                warn!(error = %e, "Failed to save search history");
            }
        }

        let mut summary = RunSummary::from_reports(started_at, releases_found, reports);
        summary.cancelled = cancel.is_cancelled();
        summary.halted = halt.is_cancelled();

        info!(
            scanned = summary.releases_scanned,
            matched = summary.releases_matched,
            unmatched = summary.releases_unmatched,
            skipped = summary.releases_skipped,
            failed = summary.releases_failed,
            persisted = summary.matches_persisted,
            cancelled = summary.cancelled,
            halted = summary.halted,
            "Cross-seed run finished"
        );
        Ok(summary)
    }
}

async fn worker_loop(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    pipeline: Arc<ReleasePipeline>,
    cancel: CancelToken,
    halt: CancelToken,
    clock: Arc<dyn Clock>,
    delay: Duration,
) -> Vec<ReleaseReport> {
    let mut reports = Vec::new();
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                _ = halt.cancelled() => None,
                path = rx.recv() => path,
            }
        };
        let Some(path) = next else {
            break;
        };

        debug!(worker, path = %path.display(), "Picked up release");
        reports.push(pipeline.process(&path, &halt).await);

        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = halt.cancelled() => break,
                _ = clock.sleep(delay) => {}
            }
        }
    }
    debug!(worker, processed = reports.len(), "Worker stopped");
    reports
}
