use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::matcher::MatchingConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::searcher::RetryConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

/// Filesystem locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory whose entries are treated as individual releases.
    pub parse_dir: PathBuf,
    /// Directory where matched .torrent files are written.
    pub save_path: PathBuf,
    /// Treat `parse_dir` itself as a single release instead of a directory of releases.
    #[serde(default)]
    pub single_release: bool,
}

/// Search history configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Whether the JSON search history is read and written.
    #[serde(default)]
    pub enabled: bool,
    /// History file; relative paths are resolved against `paths.save_path`.
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    /// Search releases again even if the history says they were searched.
    #[serde(default)]
    pub ignore_searched: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_history_path(),
            ignore_searched: false,
        }
    }
}

impl HistoryConfig {
    /// Resolve the history file location against the save path.
    pub fn resolve_path(&self, save_path: &std::path::Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            save_path.join(&self.path)
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("crossseed-history.json")
}

/// Run report output options
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Print the run summary as JSON instead of text.
    #[serde(default)]
    pub json: bool,
    /// Dump Prometheus metrics in text format after the run.
    #[serde(default)]
    pub metrics: bool,
}

/// Available search backends
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Jackett,
}

/// A single indexer backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend name, used in logs and reports.
    pub name: String,
    #[serde(default)]
    pub kind: BackendKind,
    /// Server URL (e.g., "http://localhost:9117")
    pub url: String,
    /// API key
    pub api_key: String,
    /// Jackett indexer to query ("all" aggregates every configured tracker).
    #[serde(default = "default_indexer")]
    pub indexer: String,
    /// Restrict searches to these tracker ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackers: Option<Vec<String>>,
    /// Minimum interval between two requests to this backend (milliseconds).
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_indexer() -> String {
    "all".to_string()
}

fn default_min_interval() -> u64 {
    1000
}

fn default_timeout() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub paths: PathsConfig,
    pub matching: MatchingConfig,
    pub orchestrator: OrchestratorConfig,
    pub retry: RetryConfig,
    pub history: HistoryConfig,
    pub backends: Vec<SanitizedBackendConfig>,
}

/// Sanitized backend config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBackendConfig {
    pub name: String,
    pub url: String,
    pub indexer: String,
    pub api_key_configured: bool,
    pub trackers: Option<Vec<String>>,
    pub min_interval_ms: u64,
    pub enabled: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            paths: config.paths.clone(),
            matching: config.matching.clone(),
            orchestrator: config.orchestrator.clone(),
            retry: config.retry.clone(),
            history: config.history.clone(),
            backends: config
                .backends
                .iter()
                .map(|b| SanitizedBackendConfig {
                    name: b.name.clone(),
                    url: b.url.clone(),
                    indexer: b.indexer.clone(),
                    api_key_configured: !b.api_key.is_empty(),
                    trackers: b.trackers.clone(),
                    min_interval_ms: b.min_interval_ms,
                    enabled: b.enabled,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[paths]
parse_dir = "/data/complete"
save_path = "/data/watch"
"#;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.paths.parse_dir.to_str().unwrap(), "/data/complete");
        assert!(!config.paths.single_release);
        assert!(config.backends.is_empty());
        assert!(!config.history.enabled);
        assert_eq!(config.orchestrator.workers, 2);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_deserialize_missing_paths_fails() {
        let toml = r#"
[matching]
threshold = 0.5
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_backends() {
        let toml = format!(
            r#"{MINIMAL}
[[backends]]
name = "jackett"
url = "http://localhost:9117"
api_key = "secret"
trackers = ["trackerA", "trackerB"]

[[backends]]
name = "second"
url = "http://other:9117"
api_key = "key"
indexer = "trackerc"
min_interval_ms = 5000
enabled = false
"#
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.backends.len(), 2);

        let first = &config.backends[0];
        assert_eq!(first.kind, BackendKind::Jackett);
        assert_eq!(first.indexer, "all");
        assert_eq!(first.min_interval_ms, 1000);
        assert_eq!(first.timeout_secs, 30);
        assert!(first.enabled);
        assert_eq!(
            first.trackers.as_deref(),
            Some(&["trackerA".to_string(), "trackerB".to_string()][..])
        );

        let second = &config.backends[1];
        assert_eq!(second.indexer, "trackerc");
        assert_eq!(second.min_interval_ms, 5000);
        assert!(!second.enabled);
    }

    #[test]
    fn test_history_path_resolution() {
        let history = HistoryConfig::default();
        let resolved = history.resolve_path(std::path::Path::new("/data/watch"));
        assert_eq!(
            resolved.to_str().unwrap(),
            "/data/watch/crossseed-history.json"
        );

        let absolute = HistoryConfig {
            path: PathBuf::from("/var/lib/history.json"),
            ..Default::default()
        };
        assert_eq!(
            absolute
                .resolve_path(std::path::Path::new("/data/watch"))
                .to_str()
                .unwrap(),
            "/var/lib/history.json"
        );
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let toml = format!(
            r#"{MINIMAL}
[[backends]]
name = "jackett"
url = "http://localhost:9117"
api_key = "secret-key"
"#
        );
        let config: Config = toml::from_str(&toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert_eq!(sanitized.backends.len(), 1);
        assert!(sanitized.backends[0].api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
