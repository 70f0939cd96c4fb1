pub mod clock;
pub mod config;
pub mod fingerprint;
pub mod matcher;
pub mod metrics;
pub mod orchestrator;
pub mod persist;
pub mod release;
pub mod searcher;
pub mod testing;

pub use clock::{Clock, TokioClock};
pub use config::{
    load_config, load_config_from_str, validate_config, BackendConfig, BackendKind, Config,
    ConfigError, HistoryConfig, OutputConfig, PathsConfig, SanitizedConfig,
};
pub use fingerprint::{build_query, fingerprint, Fingerprint, ParsedName, ReleaseKind};
pub use matcher::{DefaultMatchPolicy, MatchDecision, MatchPolicy, MatchResult, Matcher, MatchingConfig};
pub use orchestrator::{
    CancelToken, CrossSeedOrchestrator, ErrorKind, OrchestratorConfig, OrchestratorError,
    RunSummary,
};
pub use persist::{FsTorrentStore, PersistError, PersistOutcome, SearchHistory, TorrentPersister};
pub use release::{FileEntry, LocalRelease, ScanError};
pub use searcher::{Candidate, Indexer, IndexerClient, IndexerError, JackettIndexer, SearchQuery};
