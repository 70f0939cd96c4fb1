//! Indexer search abstraction.
//!
//! This module provides an `Indexer` trait for search backends (Jackett),
//! and an `IndexerClient` that fans queries out across every configured
//! backend with per-backend rate gating and retry with backoff.

mod client;
mod jackett;
mod rate_limiter;
mod retry;
mod torrent_parser;
mod types;

pub use client::{BackendStatus, IndexerClient};
pub use jackett::JackettIndexer;
pub use rate_limiter::{RateGate, RateGateStatus};
pub use retry::{RetryConfig, RetryFailure, RetryPolicy};
pub use torrent_parser::{parse_torrent, TorrentParseError, TorrentSummary};
pub use types::*;
