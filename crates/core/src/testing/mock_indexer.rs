//! Mock indexer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::searcher::{Candidate, Indexer, IndexerError, SearchQuery};

/// A query handler that produces results dynamically based on the query.
type QueryHandler = Box<dyn Fn(&SearchQuery) -> Vec<Candidate> + Send + Sync>;

/// Mock implementation of the Indexer trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable candidates, or compute them per query
/// - Serve .torrent bytes by download URI
/// - Count and record calls for assertions
/// - Inject one-shot or persistent failures
///
/// # Example
///
/// ```rust,ignore
/// use crossseed_core::testing::{fixtures, MockIndexer};
///
/// let indexer = MockIndexer::new("jackett");
/// let candidate = fixtures::candidate("jackett", "trackera", "Show Name S01E01", Some(1_000));
/// indexer.set_torrent(candidate.download_uri.clone().unwrap(), fixtures::torrent_bytes("Show", &[("a.mkv", 1_000)]));
/// indexer.add_candidate(candidate);
///
/// // ... run the pipeline ...
/// assert_eq!(indexer.fetch_calls(), 1);
/// ```
pub struct MockIndexer {
    id: String,
    candidates: Mutex<Vec<Candidate>>,
    query_handler: Mutex<Option<QueryHandler>>,
    torrents: Mutex<HashMap<String, Vec<u8>>>,
    /// Failures returned by the next searches, in order.
    queued_search_errors: Mutex<VecDeque<IndexerError>>,
    /// Failure returned by every search once the queue is empty.
    search_error: Mutex<Option<IndexerError>>,
    fetch_error: Mutex<Option<IndexerError>>,
    queries: Mutex<Vec<SearchQuery>>,
    fetched: Mutex<Vec<String>>,
    search_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl std::fmt::Debug for MockIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockIndexer")
            .field("id", &self.id)
            .field("search_calls", &self.search_calls())
            .field("fetch_calls", &self.fetch_calls())
            .finish()
    }
}

impl MockIndexer {
    /// Create a mock indexer with no results.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            candidates: Mutex::new(Vec::new()),
            query_handler: Mutex::new(None),
            torrents: Mutex::new(HashMap::new()),
            queued_search_errors: Mutex::new(VecDeque::new()),
            search_error: Mutex::new(None),
            fetch_error: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            search_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Add a candidate returned by every search.
    pub fn add_candidate(&self, candidate: Candidate) {
        self.candidates.lock().unwrap().push(candidate);
    }

    /// Replace the candidates returned by every search.
    pub fn set_candidates(&self, candidates: Vec<Candidate>) {
        *self.candidates.lock().unwrap() = candidates;
    }

    /// Compute results from the query instead of returning the fixed list.
    pub fn set_query_handler<F>(&self, handler: F)
    where
        F: Fn(&SearchQuery) -> Vec<Candidate> + Send + Sync + 'static,
    {
        *self.query_handler.lock().unwrap() = Some(Box::new(handler));
    }

    /// Serve `bytes` for a download URI.
    pub fn set_torrent(&self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.torrents.lock().unwrap().insert(uri.into(), bytes);
    }

    /// Fail the next search with `error`. Calls queue up.
    pub fn fail_next_search(&self, error: IndexerError) {
        self.queued_search_errors.lock().unwrap().push_back(error);
    }

    /// Fail every search with `error`.
    pub fn fail_searches_with(&self, error: IndexerError) {
        *self.search_error.lock().unwrap() = Some(error);
    }

    /// Fail every torrent download with `error`.
    pub fn fail_fetches_with(&self, error: IndexerError) {
        *self.fetch_error.lock().unwrap() = Some(error);
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        self.queued_search_errors.lock().unwrap().clear();
        *self.search_error.lock().unwrap() = None;
        *self.fetch_error.lock().unwrap() = None;
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Queries received so far.
    pub fn recorded_queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Download URIs requested so far.
    pub fn fetched_uris(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, IndexerError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        if let Some(error) = self.queued_search_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        if let Some(error) = self.search_error.lock().unwrap().clone() {
            return Err(error);
        }

        if let Some(handler) = self.query_handler.lock().unwrap().as_ref() {
            return Ok(handler(query));
        }
        Ok(self.candidates.lock().unwrap().clone())
    }

    async fn fetch_torrent(&self, candidate: &Candidate) -> Result<Vec<u8>, IndexerError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let uri = candidate
            .download_uri
            .clone()
            .ok_or(IndexerError::NoDownloadLink)?;
        self.fetched.lock().unwrap().push(uri.clone());

        if let Some(error) = self.fetch_error.lock().unwrap().clone() {
            return Err(error);
        }

        self.torrents
            .lock()
            .unwrap()
            .get(&uri)
            .cloned()
            .ok_or(IndexerError::Client { status: 404 })
    }
}
