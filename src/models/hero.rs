//! Hero reference data.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::HeroId;
use crate::storage::{Document, DocumentStore, StorageError};

/// A selectable playable character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    #[serde(alias = "hero_id")]
    pub id: HeroId,

    pub name: String,

    /// Role/class tags (e.g. "Fighter", "Mage")
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Hero {
    pub fn new(id: impl Into<HeroId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Build a hero from a synced document. Needs `hero_id` and `name`;
    /// roles are read from `roles` (array) or `role` (string or array).
    pub fn from_document(doc: &Document) -> Option<Self> {
        let id = doc.get("hero_id").and_then(HeroId::from_json)?;
        let name = doc.get("name").and_then(Value::as_str)?.trim();
        if name.is_empty() {
            return None;
        }

        let roles = match doc.get("roles").or_else(|| doc.get("role")) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            id,
            name: name.to_string(),
            roles,
        })
    }
}

/// Immutable lookup table of heroes by id and by name.
#[derive(Debug, Clone, Default)]
pub struct HeroDirectory {
    by_id: HashMap<HeroId, Hero>,
    by_name: HashMap<String, HeroId>,
}

impl HeroDirectory {
    pub fn new(heroes: impl IntoIterator<Item = Hero>) -> Self {
        let mut dir = Self::default();
        for hero in heroes {
            if dir.by_id.contains_key(&hero.id) {
                warn!("Duplicate hero id {} ({}), keeping first", hero.id, hero.name);
                continue;
            }
            dir.by_name.insert(hero.name.to_lowercase(), hero.id);
            dir.by_id.insert(hero.id, hero);
        }
        dir
    }

    /// Load a JSON array of heroes from disk.
    pub fn from_file(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Err(StorageError::PathNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let heroes: Vec<Hero> = serde_json::from_str(&contents)?;
        debug!("Loaded {} heroes from {:?}", heroes.len(), path);
        Ok(Self::new(heroes))
    }

    /// Build the directory from the documents of the synced collection,
    /// skipping documents without an id or a name.
    pub fn from_documents<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Self {
        Self::new(docs.into_iter().filter_map(Hero::from_document))
    }

    /// Load from `path`, or from the documents of `collection` when the
    /// file is absent.
    pub async fn load(
        path: &Path,
        store: &dyn DocumentStore,
        collection: &str,
    ) -> Result<Self, StorageError> {
        match Self::from_file(path) {
            Err(StorageError::PathNotFound(_)) => {
                info!(
                    "{:?} not found, reading heroes from collection '{}'",
                    path, collection
                );
                let docs = store.list(collection).await?;
                Ok(Self::from_documents(docs.iter().map(|(_, d)| d)))
            }
            other => other,
        }
    }

    pub fn get(&self, id: HeroId) -> Option<&Hero> {
        self.by_id.get(&id)
    }

    pub fn name_of(&self, id: HeroId) -> Option<&str> {
        self.get(id).map(|h| h.name.as_str())
    }

    /// Case-insensitive lookup by display name.
    pub fn id_by_name(&self, name: &str) -> Option<HeroId> {
        self.by_name.get(&name.trim().to_lowercase()).copied()
    }

    /// Lookup treating spaces and hyphens as the same character, for
    /// slugs written without escaping. Ambiguous names resolve to nothing.
    pub fn id_by_slug_name(&self, name: &str) -> Option<HeroId> {
        let wanted = fold_separators(&name.trim().to_lowercase());
        let mut hits = self
            .by_name
            .iter()
            .filter(|(known, _)| fold_separators(known) == wanted)
            .map(|(_, id)| *id);
        match (hits.next(), hits.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }

    /// Heroes whose name contains `query` (case-insensitive), sorted by name.
    pub fn search(&self, query: &str) -> Vec<&Hero> {
        let needle = query.trim().to_lowercase();
        let mut hits: Vec<&Hero> = self
            .by_id
            .values()
            .filter(|h| h.name.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn fold_separators(name: &str) -> String {
    name.replace('-', " ")
}
