//! Multi-backend indexer client.
//!
//! Fans a query out to every enabled backend, each behind its own rate gate
//! and the shared retry policy, and merges what comes back. A failing backend
//! contributes nothing plus a [`BackendFailure`]; it never fails the query.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::config::{BackendConfig, BackendKind};
use crate::metrics;

use super::jackett::JackettIndexer;
use super::rate_limiter::{RateGate, RateGateStatus};
use super::retry::{RetryConfig, RetryFailure, RetryPolicy};
use super::{BackendFailure, Candidate, Indexer, IndexerError, SearchOutcome, SearchQuery};

struct Backend {
    indexer: Arc<dyn Indexer>,
    gate: RateGate,
    disabled: AtomicBool,
}

impl Backend {
    fn is_active(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    /// Disable after a fatal error. Returns true on the first call.
    fn disable(&self) -> bool {
        !self.disabled.swap(true, Ordering::SeqCst)
    }
}

/// Status of one backend.
#[derive(Debug, Clone)]
pub struct BackendStatus {
    pub id: String,
    pub enabled: bool,
    pub rate_gate: RateGateStatus,
}

pub struct IndexerClient {
    backends: Vec<Backend>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl IndexerClient {
    pub fn new(retry: RetryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            backends: Vec::new(),
            retry: RetryPolicy::new(retry, clock.clone()),
            clock,
        }
    }

    /// Build a client with one backend per enabled backend config.
    pub fn from_config(
        backends: &[BackendConfig],
        retry: RetryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, IndexerError> {
        let mut client = Self::new(retry, clock);
        for config in backends.iter().filter(|b| b.enabled) {
            let indexer: Arc<dyn Indexer> = match config.kind {
                BackendKind::Jackett => Arc::new(JackettIndexer::new(config.clone())?),
            };
            client.add_backend(indexer, Duration::from_millis(config.min_interval_ms));
        }
        Ok(client)
    }

    /// Register a backend behind a gate with the given minimum interval.
    pub fn add_backend(&mut self, indexer: Arc<dyn Indexer>, min_interval: Duration) {
        debug!(
            backend = indexer.id(),
            min_interval_ms = min_interval.as_millis() as u64,
            "Registered backend"
        );
        self.backends.push(Backend {
            gate: RateGate::new(min_interval, self.clock.clone()),
            indexer,
            disabled: AtomicBool::new(false),
        });
    }

    pub fn with_backend(mut self, indexer: Arc<dyn Indexer>, min_interval: Duration) -> Self {
        self.add_backend(indexer, min_interval);
        self
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    pub fn active_backend_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_active()).count()
    }

    pub async fn status(&self) -> Vec<BackendStatus> {
        let mut statuses = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            statuses.push(BackendStatus {
                id: backend.indexer.id().to_string(),
                enabled: backend.is_active(),
                rate_gate: backend.gate.status().await,
            });
        }
        statuses
    }

    /// Query every active backend concurrently and merge the results.
    ///
    /// Returns [`IndexerError::AllBackendsExhausted`] once no backend is
    /// left enabled.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, IndexerError> {
        let active: Vec<&Backend> = self.backends.iter().filter(|b| b.is_active()).collect();
        if active.is_empty() {
            return Err(IndexerError::AllBackendsExhausted);
        }

        debug!(backends = active.len(), query = %query.text, "Starting parallel search");

        let searches = active.iter().map(|backend| async move {
            let backend: &Backend = backend;
            let result = self
                .retry
                .run(backend.indexer.id(), move || async move {
                    backend.gate.acquire().await;
                    backend.indexer.search(query).await
                })
                .await;
            (backend, result)
        });

        let mut outcome = SearchOutcome {
            backends_queried: active.len(),
            ..SearchOutcome::default()
        };
        for (backend, result) in join_all(searches).await {
            let id = backend.indexer.id();
            match result {
                Ok((mut candidates, attempts)) => {
                    debug!(backend = id, results = candidates.len(), attempts = attempts, "Backend search complete");
                    metrics::SEARCHES.with_label_values(&[id, "success"]).inc();
                    outcome.candidates.append(&mut candidates);
                }
                Err(failure) => {
                    let disabled = self.record_failure(backend, &failure, "search");
                    outcome.failures.push(BackendFailure {
                        backend: id.to_string(),
                        kind: failure.error.kind(),
                        message: failure.error.to_string(),
                        attempts: failure.attempts,
                        disabled,
                    });
                }
            }
        }

        if self.active_backend_count() == 0 {
            error!("Every backend is disabled");
            return Err(IndexerError::AllBackendsExhausted);
        }

        Ok(outcome)
    }

    /// Download a candidate's .torrent through the backend that returned it.
    pub async fn fetch_torrent_bytes(&self, candidate: &Candidate) -> Result<Vec<u8>, IndexerError> {
        let backend = self
            .backends
            .iter()
            .find(|b| b.indexer.id() == candidate.indexer_id)
            .ok_or_else(|| IndexerError::UnknownBackend(candidate.indexer_id.clone()))?;

        if !backend.is_active() {
            return Err(IndexerError::InvalidConfig(format!(
                "backend {} is disabled",
                candidate.indexer_id
            )));
        }
        if candidate.download_uri.is_none() {
            return Err(IndexerError::NoDownloadLink);
        }

        let id = backend.indexer.id();
        let result = self
            .retry
            .run(id, move || async move {
                backend.gate.acquire().await;
                backend.indexer.fetch_torrent(candidate).await
            })
            .await;

        match result {
            Ok((bytes, _)) => {
                metrics::TORRENT_FETCHES.with_label_values(&[id, "success"]).inc();
                Ok(bytes)
            }
            Err(failure) => {
                metrics::TORRENT_FETCHES.with_label_values(&[id, "error"]).inc();
                self.record_failure(backend, &failure, "fetch");
                Err(failure.error)
            }
        }
    }

    /// Log a failed call and disable the backend on fatal errors.
    /// Returns whether this call disabled it.
    fn record_failure(&self, backend: &Backend, failure: &RetryFailure, operation: &str) -> bool {
        let id = backend.indexer.id();
        if failure.error.is_fatal() {
            metrics::SEARCHES.with_label_values(&[id, "disabled"]).inc();
            let first = backend.disable();
            if first {
                error!(
                    backend = id,
                    operation = operation,
                    error = %failure.error,
                    "Backend disabled for the rest of the run"
                );
            }
            first
        } else {
            if operation == "search" {
                metrics::SEARCHES.with_label_values(&[id, "error"]).inc();
            }
            warn!(
                backend = id,
                operation = operation,
                attempts = failure.attempts,
                error = %failure.error,
                "Backend call failed"
            );
            false
        }
    }
}
