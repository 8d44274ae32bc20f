//! # Hero Meta
//!
//! Hero statistics for a MOBA: a batch job mirroring the upstream
//! aggregated dataset into a document collection, and the logic behind a
//! hero search dashboard.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (hero ids, tiers, heroes, graph points)
//! - **storage**: Document collections, JSONL files and the local key-value store
//! - **fetch**: HTTP client for the upstream statistics API
//! - **chart**: Time-series normalization, axis domains and tooltip deltas
//! - **dashboard**: Selection, recent searches, URL slugs and query cache
//! - **sync**: Batch overwrite of the hero collection
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod models;
pub mod storage;
pub mod sync;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num * multiplier))
}
