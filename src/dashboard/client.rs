//! Read endpoints of the upstream statistics API.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::fetch::{FetchError, Fetcher};
use crate::models::{HeroId, RankFilter, Tier};

/// Window of the trend graph, in days.
pub const GRAPH_PERIOD_DAYS: u32 = 30;

/// A failed read. Displays as a generic message; the transport error is
/// kept as the source.
#[derive(Debug, Error)]
#[error("{context}")]
pub struct ApiClientError {
    pub context: &'static str,
    #[source]
    pub source: FetchError,
}

impl ApiClientError {
    fn wrap(context: &'static str) -> impl FnOnce(FetchError) -> Self {
        move |source| Self { context, source }
    }
}

#[async_trait]
pub trait StatsApi: Send + Sync {
    async fn hero_info(&self, hero: HeroId) -> Result<Value, ApiClientError>;

    async fn hero_details(&self, hero: HeroId, tier: Tier) -> Result<Value, ApiClientError>;

    /// Daily rates over the last [`GRAPH_PERIOD_DAYS`] days.
    async fn hero_graph(&self, hero: HeroId, tier: Tier) -> Result<Value, ApiClientError>;

    async fn meta_stats(&self, hero: HeroId) -> Result<Value, ApiClientError>;

    async fn leaderboard(&self, rank: RankFilter) -> Result<Value, ApiClientError>;
}

/// [`StatsApi`] over HTTP.
pub struct HttpStatsApi {
    fetcher: Fetcher,
}

impl HttpStatsApi {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl StatsApi for HttpStatsApi {
    async fn hero_info(&self, hero: HeroId) -> Result<Value, ApiClientError> {
        self.fetcher
            .get_json("api/mlbb/heroes", &[("id", hero.to_string())])
            .await
            .map_err(ApiClientError::wrap("Failed to fetch hero info"))
    }

    async fn hero_details(&self, hero: HeroId, tier: Tier) -> Result<Value, ApiClientError> {
        self.fetcher
            .get_json(
                "api/mlbb/details",
                &[("id", hero.to_string()), ("rank", tier.level().to_string())],
            )
            .await
            .map_err(ApiClientError::wrap("Failed to fetch hero details"))
    }

    async fn hero_graph(&self, hero: HeroId, tier: Tier) -> Result<Value, ApiClientError> {
        self.fetcher
            .get_json(
                "api/mlbb/graph",
                &[
                    ("id", hero.to_string()),
                    ("period", GRAPH_PERIOD_DAYS.to_string()),
                    ("rank", tier.level().to_string()),
                ],
            )
            .await
            .map_err(ApiClientError::wrap("Failed to fetch hero graph"))
    }

    async fn meta_stats(&self, hero: HeroId) -> Result<Value, ApiClientError> {
        self.fetcher
            .get_json("api/mlbb/meta-heroes", &[("id", hero.to_string())])
            .await
            .map_err(ApiClientError::wrap("Failed to fetch meta stats"))
    }

    async fn leaderboard(&self, rank: RankFilter) -> Result<Value, ApiClientError> {
        self.fetcher
            .get_json("api/mlbb/final", &[("rank", rank.query_value())])
            .await
            .map_err(ApiClientError::wrap("Failed to fetch leaderboard"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetcherConfig;
    use std::time::Duration;

    fn unreachable_api() -> HttpStatsApi {
        let fetcher = Fetcher::new(FetcherConfig {
            base_url: "http://127.0.0.1:1/".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();
        HttpStatsApi::new(fetcher)
    }

    #[tokio::test]
    async fn test_transport_failure_is_generic_message() {
        let api = unreachable_api();
        let err = api.hero_info(HeroId::new(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch hero info");
        assert!(matches!(err.source, FetchError::Http(_)));

        let err = api.hero_graph(HeroId::new(1), Tier::Mythic).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch hero graph");
    }

    #[tokio::test]
    async fn test_leaderboard_failure_message() {
        let err = unreachable_api()
            .leaderboard(RankFilter::Overall)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch leaderboard");
    }
}
