//! Keyed query-result cache.
//!
//! Every read query is identified by a [`QueryKey`] holding its full
//! parameter tuple; results are cached per key and dropped with
//! [`QueryCache::invalidate`].

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::models::{HeroId, RankFilter, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    HeroInfo(HeroId),
    HeroDetails(HeroId, Tier),
    HeroGraph(HeroId, Tier),
    MetaStats(HeroId),
    Leaderboard(RankFilter),
}

impl QueryKey {
    pub fn hero(&self) -> Option<HeroId> {
        match self {
            QueryKey::HeroInfo(id)
            | QueryKey::HeroDetails(id, _)
            | QueryKey::HeroGraph(id, _)
            | QueryKey::MetaStats(id) => Some(*id),
            QueryKey::Leaderboard(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    Loading,
    Ready(Value),
    Failed(String),
}

impl QueryState {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            QueryState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, QueryState>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<&QueryState> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn mark_loading(&mut self, key: QueryKey) {
        self.entries.insert(key, QueryState::Loading);
    }

    pub fn insert(&mut self, key: QueryKey, state: QueryState) {
        self.entries.insert(key, state);
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&mut self, key: &QueryKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            debug!("Invalidated {:?}", key);
        }
        removed
    }

    /// Drop every entry matching `predicate`, returning how many went.
    pub fn invalidate_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|k, _| !predicate(k));
        before - self.entries.len()
    }

    /// Drop the failed entries of `hero`, returning how many went.
    pub fn clear_failed(&mut self, hero: HeroId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|k, state| !(k.hero() == Some(hero) && matches!(state, QueryState::Failed(_))));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
