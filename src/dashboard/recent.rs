//! Recently searched heroes, persisted in local storage.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::HeroId;
use crate::storage::{LocalStore, StorageError};

/// Local storage key holding the serialized list.
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

/// Maximum number of remembered searches.
pub const RECENT_SEARCHES_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub id: HeroId,
    pub name: String,
}

/// Most-recent-first list of searches, at most
/// [`RECENT_SEARCHES_CAPACITY`] entries, unique by hero id.
pub struct RecentSearches<S: LocalStore> {
    store: Arc<S>,
    entries: Vec<RecentSearch>,
}

impl<S: LocalStore> RecentSearches<S> {
    /// Load the persisted list. Unreadable contents start an empty list.
    pub fn load(store: Arc<S>) -> Result<Self, StorageError> {
        let entries = match store.get(RECENT_SEARCHES_KEY)? {
            Some(raw) => match serde_json::from_str::<Vec<RecentSearch>>(&raw) {
                Ok(entries) => sanitize(entries),
                Err(e) => {
                    warn!("Ignoring unreadable recent searches: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        debug!("Loaded {} recent searches", entries.len());
        Ok(Self { store, entries })
    }

    pub fn entries(&self) -> &[RecentSearch] {
        &self.entries
    }

    /// Move `id` to the front, dropping the oldest entry past capacity,
    /// and persist the result.
    pub fn record(&mut self, id: HeroId, name: impl Into<String>) -> Result<(), StorageError> {
        let mut updated = Vec::with_capacity(RECENT_SEARCHES_CAPACITY);
        updated.push(RecentSearch {
            id,
            name: name.into(),
        });
        updated.extend(self.entries.iter().filter(|e| e.id != id).cloned());
        updated.truncate(RECENT_SEARCHES_CAPACITY);

        self.store
            .set(RECENT_SEARCHES_KEY, &serde_json::to_string(&updated)?)?;
        self.entries = updated;
        Ok(())
    }
}

/// Re-apply the list invariants to data read from storage.
fn sanitize(entries: Vec<RecentSearch>) -> Vec<RecentSearch> {
    let mut seen = Vec::with_capacity(RECENT_SEARCHES_CAPACITY);
    let mut out = Vec::with_capacity(RECENT_SEARCHES_CAPACITY);
    for entry in entries {
        if out.len() == RECENT_SEARCHES_CAPACITY {
            break;
        }
        if seen.contains(&entry.id) {
            continue;
        }
        seen.push(entry.id);
        out.push(entry);
    }
    out
}
