//! Search-page state: selection, tier, recent searches and the four
//! hero queries derived from them.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::cache::{QueryCache, QueryKey, QueryState};
use super::client::StatsApi;
use super::recent::{RecentSearch, RecentSearches};
use super::slug;
use crate::chart::{self, AxisDomain, DisplayPoint, Metric};
use crate::models::{HeroDirectory, HeroId, RankFilter, Tier};
use crate::storage::{LocalStore, StorageError};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Unknown hero id: {0}")]
    UnknownHero(HeroId),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedHero {
    pub id: HeroId,
    pub name: String,
}

/// Combined state of the info, details and graph queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStatus {
    pub is_loading: bool,
    /// First failure among info, details, graph
    pub error: Option<String>,
}

/// Everything the search page renders.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub hero: Option<SelectedHero>,
    pub tier: Tier,
    pub status: DashboardStatus,
    pub info: Option<Value>,
    pub details: Option<Value>,
    pub meta: Option<Value>,
    pub metric: Metric,
    pub graph: Vec<DisplayPoint>,
    pub axis: Option<AxisDomain>,
    pub recent: Vec<RecentSearch>,
}

pub struct DashboardController<A: StatsApi, S: LocalStore> {
    api: Arc<A>,
    directory: HeroDirectory,
    recent: RecentSearches<S>,
    cache: QueryCache,
    selected: Option<SelectedHero>,
    tier: Tier,
}

impl<A: StatsApi, S: LocalStore> DashboardController<A, S> {
    pub fn new(
        api: Arc<A>,
        store: Arc<S>,
        directory: HeroDirectory,
        tier: Tier,
    ) -> Result<Self, DashboardError> {
        Ok(Self {
            api,
            directory,
            recent: RecentSearches::load(store)?,
            cache: QueryCache::new(),
            selected: None,
            tier,
        })
    }

    pub fn selected(&self) -> Option<&SelectedHero> {
        self.selected.as_ref()
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn directory(&self) -> &HeroDirectory {
        &self.directory
    }

    pub fn recent_searches(&self) -> &[RecentSearch] {
        self.recent.entries()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Select a hero from user action and remember it as a recent search.
    pub fn select_hero(&mut self, id: HeroId) -> Result<(), DashboardError> {
        let name = self
            .directory
            .name_of(id)
            .ok_or(DashboardError::UnknownHero(id))?
            .to_string();

        self.recent.record(id, name.clone())?;
        info!("Selected {} ({})", name, id);
        self.select(id, name);
        Ok(())
    }

    /// Navigating to a hero retries its failed queries.
    fn select(&mut self, id: HeroId, name: String) {
        let cleared = self.cache.clear_failed(id);
        if cleared > 0 {
            debug!("Cleared {} failed queries for {}", cleared, id);
        }
        self.selected = Some(SelectedHero { id, name });
    }

    /// URL fragment addressing the current selection.
    pub fn fragment(&self) -> Option<String> {
        self.selected
            .as_ref()
            .map(|h| format!("#{}", slug::encode_name(&h.name)))
    }

    /// Restore the selection from a URL fragment. Unresolvable fragments
    /// leave the state untouched.
    pub fn load_from_fragment(&mut self, fragment: &str) -> Option<HeroId> {
        let name = slug::decode_slug(fragment)?;
        let found = self
            .directory
            .id_by_name(&name)
            .or_else(|| self.directory.id_by_slug_name(&name));
        let Some(id) = found else {
            debug!("Fragment '{}' does not name a known hero", fragment);
            return None;
        };
        let name = self.directory.name_of(id).unwrap_or(&name).to_string();
        self.select(id, name);
        Some(id)
    }

    /// Switch tier. Cached tier-dependent results for the selected hero
    /// under the old tier are dropped so they are fetched again.
    pub fn change_tier(&mut self, tier: Tier) -> usize {
        if tier == self.tier {
            return 0;
        }
        let old = std::mem::replace(&mut self.tier, tier);
        let Some(hero) = self.selected.as_ref().map(|h| h.id) else {
            return 0;
        };

        let removed = [QueryKey::HeroDetails(hero, old), QueryKey::HeroGraph(hero, old)]
            .iter()
            .filter(|key| self.cache.invalidate(key))
            .count();
        info!("Tier changed {} -> {}, invalidated {} queries", old, tier, removed);
        removed
    }

    /// Queries implied by the current selection, in display priority
    /// order. Empty until a hero is selected.
    pub fn active_queries(&self) -> Vec<QueryKey> {
        match &self.selected {
            Some(hero) => vec![
                QueryKey::HeroInfo(hero.id),
                QueryKey::HeroDetails(hero.id, self.tier),
                QueryKey::HeroGraph(hero.id, self.tier),
                QueryKey::MetaStats(hero.id),
            ],
            None => Vec::new(),
        }
    }

    /// Active queries with nothing cached yet. They are marked loading.
    pub fn pending_queries(&mut self) -> Vec<QueryKey> {
        let pending: Vec<QueryKey> = self
            .active_queries()
            .into_iter()
            .filter(|k| !self.cache.contains(k))
            .collect();
        for key in &pending {
            self.cache.mark_loading(*key);
        }
        pending
    }

    /// Apply a finished query. Results for keys that are no longer active
    /// are discarded; returns whether the result was kept.
    pub fn complete(&mut self, key: QueryKey, result: Result<Value, String>) -> bool {
        if !self.active_queries().contains(&key) {
            debug!("Discarding late result for {:?}", key);
            if self.cache.get(&key).is_some_and(QueryState::is_loading) {
                self.cache.invalidate(&key);
            }
            return false;
        }

        let state = match result {
            Ok(value) => QueryState::Ready(value),
            Err(message) => {
                warn!("Query {:?} failed: {}", key, message);
                QueryState::Failed(message)
            }
        };
        self.cache.insert(key, state);
        true
    }

    /// Issue every pending query concurrently and apply the results.
    pub async fn refresh(&mut self) -> DashboardStatus {
        let pending = self.pending_queries();
        if !pending.is_empty() {
            let api = Arc::clone(&self.api);
            let results = join_all(pending.iter().map(|key| run_query(api.as_ref(), *key))).await;
            for (key, result) in pending.into_iter().zip(results) {
                self.complete(key, result);
            }
        }
        self.status()
    }

    /// Loading if any of info/details/graph is loading; error is the first
    /// failure among them in that order. Meta stats do not count.
    pub fn status(&self) -> DashboardStatus {
        let primary: Vec<Option<&QueryState>> = self
            .active_queries()
            .iter()
            .filter(|k| !matches!(k, QueryKey::MetaStats(_)))
            .map(|k| self.cache.get(k))
            .collect();

        DashboardStatus {
            is_loading: primary.iter().any(|s| s.is_some_and(QueryState::is_loading)),
            error: primary
                .iter()
                .find_map(|s| s.and_then(QueryState::error))
                .map(str::to_string),
        }
    }

    fn data_for(&self, key: QueryKey) -> Option<&Value> {
        self.cache.get(&key).and_then(QueryState::data)
    }

    pub fn view(&self, metric: Metric) -> DashboardView {
        let (info, details, graph_payload, meta) = match &self.selected {
            Some(hero) => (
                self.data_for(QueryKey::HeroInfo(hero.id)).cloned(),
                self.data_for(QueryKey::HeroDetails(hero.id, self.tier)).cloned(),
                self.data_for(QueryKey::HeroGraph(hero.id, self.tier)),
                self.data_for(QueryKey::MetaStats(hero.id)).map(first_meta_entry),
            ),
            None => (None, None, None, None),
        };

        let graph = graph_payload
            .map(chart::normalize_graph_payload)
            .unwrap_or_default();
        let axis = chart::axis_domain(&graph, metric);

        DashboardView {
            hero: self.selected.clone(),
            tier: self.tier,
            status: self.status(),
            info,
            details,
            meta,
            metric,
            graph,
            axis,
            recent: self.recent.entries().to_vec(),
        }
    }

    /// Leaderboard rows for `rank`, cached per filter.
    pub async fn leaderboard(&mut self, rank: RankFilter) -> QueryState {
        let key = QueryKey::Leaderboard(rank);
        if let Some(state @ QueryState::Ready(_)) = self.cache.get(&key) {
            return state.clone();
        }

        self.cache.mark_loading(key);
        let state = match run_query(self.api.as_ref(), key).await {
            Ok(value) => QueryState::Ready(value),
            Err(message) => QueryState::Failed(message),
        };
        self.cache.insert(key, state.clone());
        state
    }
}

async fn run_query<A: StatsApi + ?Sized>(api: &A, key: QueryKey) -> Result<Value, String> {
    let result = match key {
        QueryKey::HeroInfo(id) => api.hero_info(id).await,
        QueryKey::HeroDetails(id, tier) => api.hero_details(id, tier).await,
        QueryKey::HeroGraph(id, tier) => api.hero_graph(id, tier).await,
        QueryKey::MetaStats(id) => api.meta_stats(id).await,
        QueryKey::Leaderboard(rank) => api.leaderboard(rank).await,
    };
    result.map_err(|e| e.to_string())
}

/// The meta endpoint answers with a list; the page shows its first entry.
fn first_meta_entry(value: &Value) -> Value {
    match value {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::client::ApiClientError;
    use crate::fetch::FetchError;
    use crate::models::Hero;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeApi {
        info_calls: AtomicUsize,
        /// Number of leading `hero_info` calls that fail
        info_failures: AtomicUsize,
        details_calls: AtomicUsize,
        graph_calls: AtomicUsize,
        leaderboard_calls: AtomicUsize,
        fail_details: bool,
        fail_graph: bool,
    }

    fn failure(context: &'static str) -> ApiClientError {
        ApiClientError {
            context,
            source: FetchError::HttpStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            },
        }
    }

    #[async_trait]
    impl StatsApi for FakeApi {
        async fn hero_info(&self, hero: HeroId) -> Result<Value, ApiClientError> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .info_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(failure("Failed to fetch hero info"));
            }
            Ok(json!({"hero_id": hero, "name": "info"}))
        }

        async fn hero_details(&self, hero: HeroId, tier: Tier) -> Result<Value, ApiClientError> {
            self.details_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_details {
                return Err(failure("Failed to fetch hero details"));
            }
            Ok(json!({"hero_id": hero, "rank": tier}))
        }

        async fn hero_graph(&self, _hero: HeroId, tier: Tier) -> Result<Value, ApiClientError> {
            self.graph_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_graph {
                return Err(failure("Failed to fetch hero graph"));
            }
            let win = 0.4 + tier.level() as f64 / 100.0;
            Ok(json!({"graph": {"win_rate": [
                {"date": "2024-01-02", "win_rate": win + 0.01, "ban_rate": 0.1, "app_rate": 0.2},
                {"date": "2024-01-01", "win_rate": win, "ban_rate": 0.1, "app_rate": 0.2}
            ]}}))
        }

        async fn meta_stats(&self, hero: HeroId) -> Result<Value, ApiClientError> {
            Ok(json!([{"hero_id": hero, "tier": "S"}, {"hero_id": 0}]))
        }

        async fn leaderboard(&self, rank: RankFilter) -> Result<Value, ApiClientError> {
            self.leaderboard_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"rank": rank.query_value(), "data": []}))
        }
    }

    fn directory() -> HeroDirectory {
        HeroDirectory::new(vec![
            Hero::new(1, "Miya"),
            Hero::new(2, "Balmond"),
            Hero::new(3, "Saber"),
            Hero::new(4, "Alice"),
            Hero::new(5, "Nana"),
            Hero::new(6, "Tigreal"),
            Hero::new(46, "Yi Sun-shin"),
        ])
    }

    fn controller_with(api: FakeApi) -> DashboardController<FakeApi, MemoryStore> {
        DashboardController::new(
            Arc::new(api),
            Arc::new(MemoryStore::new()),
            directory(),
            Tier::default(),
        )
        .unwrap()
    }

    fn controller() -> DashboardController<FakeApi, MemoryStore> {
        controller_with(FakeApi::default())
    }

    #[test]
    fn test_no_queries_without_selection() {
        let mut c = controller();
        assert!(c.active_queries().is_empty());
        assert!(c.pending_queries().is_empty());
        assert_eq!(c.status(), DashboardStatus::default());
        assert_eq!(c.fragment(), None);
    }

    #[test]
    fn test_select_unknown_hero() {
        let mut c = controller();
        let result = c.select_hero(HeroId::new(999));
        assert!(matches!(result, Err(DashboardError::UnknownHero(_))));
        assert!(c.selected().is_none());
        assert!(c.recent_searches().is_empty());
    }

    #[test]
    fn test_select_records_recent_and_fragment() {
        let mut c = controller();
        c.select_hero(HeroId::new(46)).unwrap();

        assert_eq!(c.fragment().as_deref(), Some("#Yi-Sun%2Dshin"));
        assert_eq!(c.recent_searches()[0].name, "Yi Sun-shin");
        assert_eq!(c.active_queries().len(), 4);
    }

    #[test]
    fn test_recent_searches_bounded_through_controller() {
        let mut c = controller();
        for id in [1, 2, 3, 4, 5, 6, 1, 46, 2] {
            c.select_hero(HeroId::new(id)).unwrap();
        }
        let ids: Vec<u32> = c.recent_searches().iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2, 46, 1, 6, 5]);
    }

    #[test]
    fn test_load_from_fragment() {
        let mut c = controller();
        assert_eq!(c.load_from_fragment("#yi-sun%2dshin"), Some(HeroId::new(46)));
        assert_eq!(c.selected().unwrap().name, "Yi Sun-shin");
        // Restoring from the URL is not a search.
        assert!(c.recent_searches().is_empty());
    }

    #[test]
    fn test_load_from_hyphenated_fragment() {
        let mut c = controller();
        assert_eq!(c.load_from_fragment("#Yi-Sun-shin"), Some(HeroId::new(46)));
        assert_eq!(c.selected().unwrap().name, "Yi Sun-shin");
    }

    #[test]
    fn test_load_from_unknown_fragment_keeps_state() {
        let mut c = controller();
        c.select_hero(HeroId::new(1)).unwrap();
        assert_eq!(c.load_from_fragment("#Nobody-Here"), None);
        assert_eq!(c.load_from_fragment(""), None);
        assert_eq!(c.selected().unwrap().id, HeroId::new(1));
    }

    #[tokio::test]
    async fn test_refresh_populates_view() {
        let mut c = controller();
        c.select_hero(HeroId::new(1)).unwrap();

        let status = c.refresh().await;
        assert_eq!(status, DashboardStatus::default());

        let view = c.view(Metric::Win);
        assert!(view.info.is_some());
        assert_eq!(view.details.unwrap()["rank"], 7);
        assert_eq!(view.meta.unwrap()["tier"], "S");
        assert_eq!(view.graph.len(), 2);
        assert_eq!(view.graph[0].label, "Jan 1");
        assert_eq!(view.graph[0].win_rate, 47.0);
        assert_eq!(view.axis, Some(AxisDomain { min: 46.0, max: 49.0 }));
    }

    #[tokio::test]
    async fn test_refresh_uses_cache() {
        let mut c = controller();
        c.select_hero(HeroId::new(1)).unwrap();
        c.refresh().await;
        c.refresh().await;
        assert_eq!(c.api.details_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tier_change_invalidates_old_tier_details() {
        let mut c = controller();
        let hero = HeroId::new(1);
        c.select_hero(hero).unwrap();
        c.refresh().await;
        assert!(c.cache().contains(&QueryKey::HeroDetails(hero, Tier::Mythic)));

        let removed = c.change_tier(Tier::Epic);
        assert_eq!(removed, 2);
        assert!(!c.cache().contains(&QueryKey::HeroDetails(hero, Tier::Mythic)));
        assert!(!c.cache().contains(&QueryKey::HeroGraph(hero, Tier::Mythic)));
        assert!(c.cache().contains(&QueryKey::HeroInfo(hero)));

        let pending = c.pending_queries();
        assert_eq!(
            pending,
            vec![
                QueryKey::HeroDetails(hero, Tier::Epic),
                QueryKey::HeroGraph(hero, Tier::Epic)
            ]
        );
    }

    #[tokio::test]
    async fn test_switching_back_refetches_old_tier() {
        let mut c = controller();
        c.select_hero(HeroId::new(1)).unwrap();
        c.refresh().await;
        c.change_tier(Tier::Epic);
        c.refresh().await;
        c.change_tier(Tier::Mythic);
        c.refresh().await;

        assert_eq!(c.api.details_calls.load(Ordering::SeqCst), 3);
        assert_eq!(c.view(Metric::Win).details.unwrap()["rank"], 7);
    }

    #[test]
    fn test_same_tier_is_noop() {
        let mut c = controller();
        c.select_hero(HeroId::new(1)).unwrap();
        assert_eq!(c.change_tier(Tier::Mythic), 0);
    }

    #[test]
    fn test_late_result_is_discarded() {
        let mut c = controller();
        let hero = HeroId::new(1);
        c.select_hero(hero).unwrap();
        let pending = c.pending_queries();
        assert_eq!(pending.len(), 4);
        assert!(c.status().is_loading);

        c.change_tier(Tier::Legend);

        let stale = QueryKey::HeroDetails(hero, Tier::Mythic);
        assert!(!c.complete(stale, Ok(json!({"rank": 7}))));
        assert!(!c.cache().contains(&stale));

        assert!(c.complete(QueryKey::HeroInfo(hero), Ok(json!({}))));
    }

    #[tokio::test]
    async fn test_error_is_first_failure_in_order() {
        let mut c = controller_with(FakeApi {
            fail_details: true,
            fail_graph: true,
            ..Default::default()
        });
        c.select_hero(HeroId::new(2)).unwrap();

        let status = c.refresh().await;
        assert!(!status.is_loading);
        assert_eq!(status.error.as_deref(), Some("Failed to fetch hero details"));

        let view = c.view(Metric::Win);
        assert!(view.graph.is_empty());
        assert_eq!(view.axis, None);
        assert!(view.info.is_some());
    }

    #[tokio::test]
    async fn test_navigating_back_retries_failed_query() {
        let mut c = controller_with(FakeApi {
            info_failures: AtomicUsize::new(1),
            ..Default::default()
        });

        c.select_hero(HeroId::new(1)).unwrap();
        let status = c.refresh().await;
        assert_eq!(status.error.as_deref(), Some("Failed to fetch hero info"));

        c.select_hero(HeroId::new(2)).unwrap();
        c.refresh().await;

        c.select_hero(HeroId::new(1)).unwrap();
        let status = c.refresh().await;
        assert_eq!(status.error, None);
        assert_eq!(c.api.info_calls.load(Ordering::SeqCst), 3);
        assert!(c.view(Metric::Win).info.is_some());
    }

    #[tokio::test]
    async fn test_fragment_navigation_retries_failed_query() {
        let mut c = controller_with(FakeApi {
            info_failures: AtomicUsize::new(1),
            ..Default::default()
        });

        c.load_from_fragment("#Miya");
        assert!(c.refresh().await.error.is_some());

        c.load_from_fragment("#Miya");
        assert_eq!(c.refresh().await.error, None);
        assert_eq!(c.api.info_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_loading_ignores_meta_stats() {
        let mut c = controller();
        let hero = HeroId::new(1);
        c.select_hero(hero).unwrap();
        c.pending_queries();
        c.complete(QueryKey::HeroInfo(hero), Ok(json!({})));
        c.complete(QueryKey::HeroDetails(hero, Tier::Mythic), Ok(json!({})));
        c.complete(QueryKey::HeroGraph(hero, Tier::Mythic), Ok(json!(null)));

        let status = c.status();
        assert!(!status.is_loading);
        assert!(c.cache().get(&QueryKey::MetaStats(hero)).unwrap().is_loading());
    }

    #[tokio::test]
    async fn test_leaderboard_cached_per_rank() {
        let mut c = controller();
        let overall = c.leaderboard(RankFilter::Overall).await;
        assert_eq!(overall.data().unwrap()["rank"], "Overall");
        c.leaderboard(RankFilter::Overall).await;
        c.leaderboard(RankFilter::Tier(Tier::Epic)).await;

        assert_eq!(c.api.leaderboard_calls.load(Ordering::SeqCst), 2);
    }
}
