//! Document collections with atomic batch writes.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError};

/// Field map of a single document.
pub type Document = Map<String, Value>;

/// One staged write. Committing it replaces the whole document: fields
/// absent from `fields` do not survive.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWrite {
    pub doc_id: String,
    pub fields: Document,
}

/// Writes staged for a single atomic commit.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<BatchWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a full overwrite of `doc_id`.
    pub fn set(&mut self, doc_id: impl Into<String>, fields: Document) -> &mut Self {
        self.writes.push(BatchWrite {
            doc_id: doc_id.into(),
            fields,
        });
        self
    }

    pub fn writes(&self) -> &[BatchWrite] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Apply onto `docs`, later writes to the same id winning.
    fn apply_to(self, docs: &mut BTreeMap<String, Document>) {
        for write in self.writes {
            docs.insert(write.doc_id, write.fields);
        }
    }
}

/// A store of named document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Commit every write in `batch` or none of them.
    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<usize, StorageError>;

    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Document>, StorageError>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StorageError>;
}

/// On-disk line format of a stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    fields: Document,
}

/// Collections kept as one JSONL file each under `collections/`.
pub struct JsonlDocumentStore {
    config: StorageConfig,
    commit_lock: Mutex<()>,
}

impl JsonlDocumentStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            commit_lock: Mutex::new(()),
        }
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, StorageError> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidCollection(collection.to_string()));
        }
        Ok(self
            .config
            .collections_dir()
            .join(format!("{}.jsonl", collection)))
    }

    fn load(&self, collection: &str) -> Result<BTreeMap<String, Document>, StorageError> {
        let path = self.collection_path(collection)?;
        let stored = JsonlReader::<StoredDocument>::new(path).read_all()?;
        Ok(stored.into_iter().map(|d| (d.id, d.fields)).collect())
    }
}

#[async_trait]
impl DocumentStore for JsonlDocumentStore {
    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<usize, StorageError> {
        let path = self.collection_path(collection)?;
        let count = batch.len();

        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| StorageError::Rejected("commit lock poisoned".to_string()))?;

        let mut docs = self.load(collection)?;
        batch.apply_to(&mut docs);

        let stored: Vec<StoredDocument> = docs
            .into_iter()
            .map(|(id, fields)| StoredDocument { id, fields })
            .collect();
        JsonlWriter::new(path).write_all(&stored)?;

        info!("Committed {} writes to collection '{}'", count, collection);
        Ok(count)
    }

    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Document>, StorageError> {
        Ok(self.load(collection)?.remove(doc_id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StorageError> {
        let docs = self.load(collection)?;
        debug!("Listed {} documents from '{}'", docs.len(), collection);
        Ok(docs.into_iter().collect())
    }
}

/// In-memory store. `reject_commits` makes every commit fail, leaving
/// the contents untouched.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Document>>>,
    commits: Mutex<Vec<(String, WriteBatch)>>,
    reject: bool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    /// Batches received so far, including rejected ones.
    pub fn commits(&self) -> Vec<(String, WriteBatch)> {
        self.commits
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn poisoned() -> StorageError {
        StorageError::Rejected("store lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<usize, StorageError> {
        self.commits
            .lock()
            .map_err(|_| Self::poisoned())?
            .push((collection.to_string(), batch.clone()));

        if self.reject {
            return Err(StorageError::Rejected(format!(
                "collection '{}' is read-only",
                collection
            )));
        }

        let count = batch.len();
        let mut collections = self.collections.lock().map_err(|_| Self::poisoned())?;
        batch.apply_to(collections.entry(collection.to_string()).or_default());
        Ok(count)
    }

    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Document>, StorageError> {
        let collections = self.collections.lock().map_err(|_| Self::poisoned())?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StorageError> {
        let collections = self.collections.lock().map_err(|_| Self::poisoned())?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn store(tmp: &TempDir) -> JsonlDocumentStore {
        JsonlDocumentStore::new(StorageConfig::new(tmp.path().to_path_buf()))
    }

    #[tokio::test]
    async fn test_jsonl_commit_and_get() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let mut batch = WriteBatch::new();
        batch.set("1", doc(json!({"hero_id": 1, "name": "Miya"})));
        batch.set("2", doc(json!({"hero_id": 2, "name": "Balmond"})));
        assert_eq!(store.commit("heroes", batch).await.unwrap(), 2);

        let miya = store.get("heroes", "1").await.unwrap().unwrap();
        assert_eq!(miya["name"], "Miya");
        assert!(store.get("heroes", "3").await.unwrap().is_none());

        let ids: Vec<String> = store
            .list("heroes")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_jsonl_overwrite_drops_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let mut batch = WriteBatch::new();
        batch.set("1", doc(json!({"hero_id": 1, "name": "Miya", "legacy": true})));
        store.commit("heroes", batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.set("1", doc(json!({"hero_id": 1, "name": "Miya"})));
        store.commit("heroes", batch).await.unwrap();

        let miya = store.get("heroes", "1").await.unwrap().unwrap();
        assert!(!miya.contains_key("legacy"));
    }

    #[tokio::test]
    async fn test_jsonl_leaves_unmentioned_documents() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let mut batch = WriteBatch::new();
        batch.set("1", doc(json!({"name": "Miya"})));
        batch.set("2", doc(json!({"name": "Balmond"})));
        store.commit("heroes", batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.set("1", doc(json!({"name": "Miya v2"})));
        store.commit("heroes", batch).await.unwrap();

        let all = store.list("heroes").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].1["name"], "Balmond");
    }

    #[tokio::test]
    async fn test_jsonl_corrupt_line_fails_commit() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let mut batch = WriteBatch::new();
        batch.set("1", doc(json!({"name": "Miya"})));
        batch.set("2", doc(json!({"name": "Balmond"})));
        store.commit("heroes", batch).await.unwrap();

        let path = tmp.path().join("collections").join("heroes.jsonl");
        let contents = std::fs::read_to_string(&path).unwrap();
        let damaged: String = {
            let mut lines: Vec<&str> = contents.lines().collect();
            let second = lines[1];
            lines[1] = &second[..second.len() / 2];
            lines.join("\n") + "\n"
        };
        std::fs::write(&path, &damaged).unwrap();

        let mut batch = WriteBatch::new();
        batch.set("3", doc(json!({"name": "Saber"})));
        let result = store.commit("heroes", batch).await;

        assert!(matches!(result, Err(StorageError::CorruptLine { line: 2, .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), damaged);
    }

    #[tokio::test]
    async fn test_jsonl_rejects_bad_collection_name() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let result = store.commit("../escape", WriteBatch::new()).await;
        assert!(matches!(result, Err(StorageError::InvalidCollection(_))));
    }

    #[tokio::test]
    async fn test_memory_store_rejecting_keeps_contents() {
        let store = MemoryDocumentStore::rejecting();

        let mut batch = WriteBatch::new();
        batch.set("1", doc(json!({"name": "Miya"})));
        let result = store.commit("heroes", batch).await;

        assert!(matches!(result, Err(StorageError::Rejected(_))));
        assert!(store.list("heroes").await.unwrap().is_empty());
        assert_eq!(store.commits().len(), 1);
    }

    #[test]
    fn test_batch_last_write_wins() {
        let mut batch = WriteBatch::new();
        batch
            .set("1", doc(json!({"v": 1})))
            .set("1", doc(json!({"v": 2})));
        assert_eq!(batch.len(), 2);

        let mut docs = BTreeMap::new();
        batch.apply_to(&mut docs);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs["1"]["v"], 2);
    }
}
