//! HTTP fetching from the upstream statistics API.
//!
//! The upstream is an opaque JSON provider. Paths are resolved against a
//! base URL that ends with `/`, so `api/mlbb/final/` lands under it.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Upstream base URL, with trailing slash
    pub base_url: String,

    /// Maximum response size (default 20MB)
    pub max_content_size: usize,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_content_size: 20 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            user_agent: format!("hero-meta/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// JSON client for the upstream API.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
    base_url: Url,
}

impl Fetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("hero-meta")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a relative path (optionally with query pairs) against the
    /// base URL.
    pub fn url_for(&self, path: &str, query: &[(&str, String)]) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", path, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GET `path` and decode the body as JSON.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = self.url_for(path, query)?;
        self.fetch_json(&url).await
    }

    /// GET an absolute URL and decode the body as JSON.
    pub async fn fetch_json(&self, url: &Url) -> Result<Value, FetchError> {
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content = response.bytes().await?;
        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        debug!("Received {} bytes from {}", content.len(), url);
        Ok(serde_json::from_slice(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base: &str) -> Fetcher {
        Fetcher::new(FetcherConfig {
            base_url: base.to_string(),
            timeout: Duration::from_secs(5),
            user_agent: "test-agent".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_for_joins_under_base() {
        let f = fetcher("https://stats.example.com/v1/");
        let url = f.url_for("api/mlbb/final/", &[]).unwrap();
        assert_eq!(url.as_str(), "https://stats.example.com/v1/api/mlbb/final/");

        let url = f.url_for("/api/mlbb/heroes", &[]).unwrap();
        assert_eq!(url.as_str(), "https://stats.example.com/v1/api/mlbb/heroes");
    }

    #[test]
    fn test_url_for_encodes_query() {
        let f = fetcher("https://stats.example.com/");
        let url = f
            .url_for("api/mlbb/final", &[("rank", "Mythical Glory".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://stats.example.com/api/mlbb/final?rank=Mythical+Glory"
        );
    }

    #[test]
    fn test_fetcher_config_default() {
        let config = FetcherConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000/");
        let fetcher = Fetcher::new(config.clone()).unwrap();
        assert_eq!(fetcher.base_url().as_str(), "http://localhost:3000/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("hero-meta/"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = Fetcher::new(FetcherConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_errors() {
        let f = fetcher("http://127.0.0.1:1/");
        let result = f.get_json("api/mlbb/final/", &[]).await;
        assert!(matches!(result, Err(FetchError::Http(_))));
    }
}
