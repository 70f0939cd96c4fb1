//! Jackett search backend implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BackendConfig;

use super::{Candidate, Indexer, IndexerError, SearchQuery};

/// Some trackers append a `[a / b / c]` tag list to titles.
static TITLE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(.+?)( \[.*/.*\])?$").unwrap());

/// Jackett search backend implementation.
pub struct JackettIndexer {
    client: Client,
    config: BackendConfig,
}

impl JackettIndexer {
    /// Create a new JackettIndexer with the given configuration.
    pub fn new(config: BackendConfig) -> Result<Self, IndexerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| IndexerError::InvalidConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the Jackett API URL for a search.
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.indexer),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(&query.text)
        );

        if let Some(category) = query.category {
            url.push_str(&format!("&Category[]={}", category.torznab_id()));
        }

        if let Some(trackers) = self.trackers(query) {
            for tracker in trackers {
                url.push_str(&format!("&Tracker[]={}", urlencoding::encode(tracker)));
            }
        }

        if let Some(season) = query.season {
            url.push_str(&format!("&season={}", season));
        }
        if let Some(episode) = query.episode {
            url.push_str(&format!("&episode={}", episode));
        }

        url
    }

    /// Tracker filter: the query's, falling back to the backend's.
    fn trackers<'a>(&'a self, query: &'a SearchQuery) -> Option<&'a [String]> {
        query
            .trackers
            .as_deref()
            .or(self.config.trackers.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Turn a Jackett JSON body into candidates.
    fn parse_response(&self, body: &str) -> Result<Vec<Candidate>, IndexerError> {
        let response: JackettResponse = serde_json::from_str(body)
            .map_err(|e| IndexerError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        // Jackett answers an unknown tracker filter with no indexers at all.
        if matches!(&response.Indexers, Some(indexers) if indexers.is_empty()) {
            return Err(IndexerError::InvalidConfig(format!(
                "no Jackett indexer matched (indexer: {}, trackers: {:?})",
                self.config.indexer, self.config.trackers
            )));
        }

        Ok(response
            .Results
            .into_iter()
            .map(|r| {
                let tracker_id = r
                    .TrackerId
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| r.Tracker.to_lowercase());
                Candidate {
                    title: strip_title_suffix(&r.Title).to_string(),
                    size_bytes: r.Size.and_then(|s| u64::try_from(s).ok()),
                    download_uri: r.Link.filter(|l| !l.is_empty()),
                    details_uri: r.Details,
                    tracker_id,
                    tracker_name: r.Tracker,
                    indexer_id: self.config.name.clone(),
                    info_hash: r.InfoHash.map(|h| h.to_lowercase()),
                    category: r.CategoryDesc,
                    files: None, // Jackett doesn't return file lists in search results
                }
            })
            .collect())
    }
}

#[async_trait]
impl Indexer for JackettIndexer {
    fn id(&self) -> &str {
        &self.config.name
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, IndexerError> {
        let url = self.build_search_url(query);
        debug!(backend = %self.config.name, query = %query.text, "Searching Jackett");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(IndexerError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                backend = %self.config.name,
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "Jackett returned an error"
            );
            return Err(IndexerError::from_status(status.as_u16()));
        }

        let body = response.text().await.map_err(IndexerError::from_reqwest)?;
        let candidates = self.parse_response(&body)?;

        debug!(
            backend = %self.config.name,
            results = candidates.len(),
            "Jackett search complete"
        );

        Ok(candidates)
    }

    async fn fetch_torrent(&self, candidate: &Candidate) -> Result<Vec<u8>, IndexerError> {
        let link = candidate
            .download_uri
            .as_deref()
            .ok_or(IndexerError::NoDownloadLink)?;

        debug!(backend = %self.config.name, tracker = %candidate.tracker_id, "Downloading torrent");

        let response = self
            .client
            .get(link)
            .send()
            .await
            .map_err(IndexerError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexerError::from_status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(IndexerError::from_reqwest)?;
        Ok(bytes.to_vec())
    }
}

/// Drop a trailing ` [a / b]` tag list from a result title.
fn strip_title_suffix(title: &str) -> &str {
    TITLE_SUFFIX
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(title)
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    #[serde(default)]
    Results: Vec<JackettResult>,
    #[serde(default)]
    Indexers: Option<Vec<JackettIndexerStatus>>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case, dead_code)]
struct JackettIndexerStatus {
    #[serde(default)]
    ID: Option<String>,
    #[serde(default)]
    Name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    #[serde(default)]
    Tracker: String,
    TrackerId: Option<String>,
    Link: Option<String>,
    Details: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    CategoryDesc: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::searcher::SearchCategory;

    fn backend(trackers: Option<Vec<&str>>) -> JackettIndexer {
        JackettIndexer::new(BackendConfig {
            name: "jackett".to_string(),
            kind: BackendKind::Jackett,
            url: "http://localhost:9117/".to_string(),
            api_key: "test-key".to_string(),
            indexer: "all".to_string(),
            trackers: trackers.map(|t| t.into_iter().map(String::from).collect()),
            min_interval_ms: 0,
            timeout_secs: 30,
            enabled: true,
        })
        .unwrap()
    }

    #[test]
    fn test_build_search_url() {
        let indexer = backend(None);
        let url = indexer.build_search_url(&SearchQuery::new("Show Name"));
        assert!(url.starts_with("http://localhost:9117/api/v2.0/indexers/all/results?"));
        assert!(url.contains("apikey=test-key"));
        assert!(url.contains("Query=Show%20Name"));
        assert!(!url.contains("Tracker[]"));
        assert!(!url.contains("season="));
    }

    #[test]
    fn test_build_search_url_with_hints_and_trackers() {
        let indexer = backend(Some(vec!["trackera", "trackerb"]));
        let query = SearchQuery {
            text: "Show Name".to_string(),
            category: Some(SearchCategory::Tv),
            season: Some(1),
            episode: Some(2),
            trackers: None,
        };

        let url = indexer.build_search_url(&query);
        assert!(url.contains("Category[]=5000"));
        assert!(url.contains("Tracker[]=trackera"));
        assert!(url.contains("Tracker[]=trackerb"));
        assert!(url.contains("season=1"));
        assert!(url.contains("episode=2"));
    }

    #[test]
    fn test_query_trackers_override_backend_trackers() {
        let indexer = backend(Some(vec!["trackera"]));
        let mut query = SearchQuery::new("x");
        query.trackers = Some(vec!["trackerc".to_string()]);

        let url = indexer.build_search_url(&query);
        assert!(url.contains("Tracker[]=trackerc"));
        assert!(!url.contains("Tracker[]=trackera"));
    }

    #[test]
    fn test_parse_response_maps_results() {
        let body = r#"{
            "Results": [
                {
                    "Title": "Movie.Name.720p.x264 [Golden Popcorn / 720p / x264]",
                    "Tracker": "Tracker A",
                    "TrackerId": "trackera",
                    "Link": "http://localhost:9117/dl/trackera/?jackett_apikey=k&path=abc",
                    "Details": "https://trackera.example/torrents/123",
                    "InfoHash": "ABCDEF",
                    "Size": 1456221312,
                    "CategoryDesc": "Movies/HD"
                },
                {
                    "Title": "No Link Result",
                    "Tracker": "Tracker B",
                    "Link": null,
                    "Size": -1
                }
            ],
            "Indexers": [{"ID": "trackera", "Name": "Tracker A"}]
        }"#;

        let candidates = backend(None).parse_response(body).unwrap();
        assert_eq!(candidates.len(), 2);

        let first = &candidates[0];
        assert_eq!(first.title, "Movie.Name.720p.x264");
        assert_eq!(first.tracker_id, "trackera");
        assert_eq!(first.tracker_name, "Tracker A");
        assert_eq!(first.indexer_id, "jackett");
        assert_eq!(first.size_bytes, Some(1_456_221_312));
        assert_eq!(first.info_hash.as_deref(), Some("abcdef"));
        assert_eq!(first.category.as_deref(), Some("Movies/HD"));

        let second = &candidates[1];
        assert_eq!(second.tracker_id, "tracker b");
        assert!(second.download_uri.is_none());
        assert!(second.size_bytes.is_none());
    }

    #[test]
    fn test_parse_response_empty_indexers_is_config_error() {
        let body = r#"{"Results": [], "Indexers": []}"#;
        let err = backend(Some(vec!["typo"])).parse_response(body).unwrap_err();
        assert!(matches!(err, IndexerError::InvalidConfig(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_parse_response_malformed_body() {
        let err = backend(None).parse_response("<html>").unwrap_err();
        assert!(matches!(err, IndexerError::InvalidResponse(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_strip_title_suffix() {
        assert_eq!(
            strip_title_suffix("Movie.Name.720p.x264 [Golden Popcorn / 720p / x264]"),
            "Movie.Name.720p.x264"
        );
        assert_eq!(strip_title_suffix("[Group] Show - 01"), "[Group] Show - 01");
        assert_eq!(strip_title_suffix("Plain Title"), "Plain Title");
    }

    #[tokio::test]
    async fn test_fetch_without_link_fails() {
        let candidate = Candidate {
            title: "x".to_string(),
            size_bytes: None,
            download_uri: None,
            details_uri: None,
            tracker_id: "t".to_string(),
            tracker_name: "T".to_string(),
            indexer_id: "jackett".to_string(),
            info_hash: None,
            category: None,
            files: None,
        };
        let err = backend(None).fetch_torrent(&candidate).await.unwrap_err();
        assert_eq!(err, IndexerError::NoDownloadLink);
    }
}
