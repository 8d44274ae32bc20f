//! Hero collection sync.
//!
//! Pulls the aggregated dataset from the upstream API and overwrites the
//! hero collection in one atomic batch:
//! 1. Fetch `api/mlbb/final/`
//! 2. Stage one full-document write per hero, stamped with `lastUpdated`
//! 3. Commit the batch
//!
//! Documents for heroes missing from the payload are left as they are.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::fetch::Fetcher;
use crate::models::HeroId;
use crate::storage::{DocumentStore, WriteBatch};

/// Upstream path of the aggregated dataset, relative to the base URL.
pub const FINAL_DATA_PATH: &str = "api/mlbb/final/";

/// Collection overwritten by the sync.
pub const DEFAULT_COLLECTION: &str = "heroes";

/// Field added to every written document.
pub const LAST_UPDATED_FIELD: &str = "lastUpdated";

pub const SUCCESS_MESSAGE: &str = "Heroes collection successfully updated";
pub const FAILURE_MESSAGE: &str = "Failed to update heroes collection";

/// Errors that can occur during sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] crate::fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Record {index} has no usable hero_id")]
    MissingHeroId { index: usize },

    #[error("Sync already in progress")]
    AlreadyRunning,
}

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Target collection
    pub collection: String,

    /// Sync interval for periodic syncs
    pub interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            interval: Duration::from_secs(6 * 3600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// State of the most recent sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    pub last_sync_started: Option<DateTime<Utc>>,
    pub last_sync_completed: Option<DateTime<Utc>>,
    pub last_sync_status: SyncStatus,
    /// Documents overwritten by the last successful run
    pub documents_written: u32,
    /// Documents in the collection that the last payload did not mention
    pub stale_documents: u32,
    pub last_error: Option<String>,
}

/// Body returned to whoever triggered the sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
}

impl SyncResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            message: FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Result of a sync run.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub documents_written: u32,
    pub stale_documents: u32,
    pub duration: Duration,
}

/// Stage one overwrite per record of `payload["data"]`.
///
/// Each document holds every field of its record plus
/// [`LAST_UPDATED_FIELD`] set to `now`. Any record without a usable
/// `hero_id` fails the whole batch.
pub fn stage_batch(payload: &Value, now: DateTime<Utc>) -> Result<WriteBatch, SyncError> {
    let records = payload
        .get("data")
        .ok_or_else(|| SyncError::MalformedPayload("missing 'data'".to_string()))?
        .as_array()
        .ok_or_else(|| SyncError::MalformedPayload("'data' is not an array".to_string()))?;

    let timestamp = Value::String(now.to_rfc3339());
    let mut batch = WriteBatch::new();

    for (index, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(SyncError::MalformedPayload(format!(
                "record {} is not an object",
                index
            )));
        };
        let hero_id = fields
            .get("hero_id")
            .and_then(HeroId::from_json)
            .ok_or(SyncError::MissingHeroId { index })?;

        let mut doc = fields.clone();
        doc.insert(LAST_UPDATED_FIELD.to_string(), timestamp.clone());
        batch.set(hero_id.doc_key(), doc);
    }

    Ok(batch)
}

/// Sync orchestrator.
pub struct HeroSync {
    config: SyncConfig,
    fetcher: Fetcher,
    store: Arc<dyn DocumentStore>,
    state: Arc<RwLock<SyncState>>,
    cancel_token: Arc<RwLock<bool>>,
}

impl HeroSync {
    pub fn new(config: SyncConfig, fetcher: Fetcher, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            fetcher,
            store,
            state: Arc::new(RwLock::new(SyncState::default())),
            cancel_token: Arc::new(RwLock::new(false)),
        }
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn state(&self) -> SyncState {
        self.state.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.last_sync_status == SyncStatus::Running
    }

    /// Stop [`HeroSync::run_periodic`] after the current tick.
    pub async fn cancel(&self) {
        *self.cancel_token.write().await = true;
    }

    /// Run once and report the outcome as a response body. Never fails:
    /// errors are logged and reported as a failure response.
    pub async fn run_once(&self) -> SyncResponse {
        match self.sync_once().await {
            Ok(_) => SyncResponse::success(),
            Err(e) => {
                error!("Error updating {} collection: {}", self.config.collection, e);
                SyncResponse::failure()
            }
        }
    }

    /// Fetch the upstream dataset and overwrite the collection.
    pub async fn sync_once(&self) -> Result<SyncResult, SyncError> {
        {
            let mut state = self.state.write().await;
            if state.last_sync_status == SyncStatus::Running {
                warn!("Sync already in progress");
                return Err(SyncError::AlreadyRunning);
            }
            state.last_sync_started = Some(Utc::now());
            state.last_sync_status = SyncStatus::Running;
            state.last_error = None;
        }

        let start = std::time::Instant::now();
        info!(
            "Starting sync of '{}' from {}",
            self.config.collection,
            self.fetcher.base_url()
        );

        let outcome = self.fetch_and_apply().await;

        let mut state = self.state.write().await;
        state.last_sync_completed = Some(Utc::now());

        match outcome {
            Ok((documents_written, stale_documents)) => {
                state.last_sync_status = SyncStatus::Completed;
                state.documents_written = documents_written;
                state.stale_documents = stale_documents;

                let duration = start.elapsed();
                info!(
                    "Sync completed: {} documents written, {} stale in {:?}",
                    documents_written, stale_documents, duration
                );
                Ok(SyncResult {
                    documents_written,
                    stale_documents,
                    duration,
                })
            }
            Err(e) => {
                state.last_sync_status = SyncStatus::Failed;
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_and_apply(&self) -> Result<(u32, u32), SyncError> {
        let payload = self.fetcher.get_json(FINAL_DATA_PATH, &[]).await?;
        self.apply_payload(&payload).await
    }

    /// Stage and commit `payload`, returning (written, stale) counts.
    async fn apply_payload(&self, payload: &Value) -> Result<(u32, u32), SyncError> {
        let batch = stage_batch(payload, Utc::now())?;
        let written_ids: HashSet<String> = batch.writes().iter().map(|w| w.doc_id.clone()).collect();

        let written = self.store.commit(&self.config.collection, batch).await? as u32;
        let stale = self.count_stale(&written_ids).await;
        Ok((written, stale))
    }

    /// Documents the last payload did not mention. Counting is best-effort;
    /// the commit has already succeeded.
    async fn count_stale(&self, written_ids: &HashSet<String>) -> u32 {
        match self.store.list(&self.config.collection).await {
            Ok(docs) => {
                let stale = docs
                    .iter()
                    .filter(|(id, _)| !written_ids.contains(id))
                    .count() as u32;
                if stale > 0 {
                    warn!(
                        "{} documents in '{}' were not in the upstream payload and were left untouched",
                        stale, self.config.collection
                    );
                }
                stale
            }
            Err(e) => {
                warn!("Could not count stale documents: {}", e);
                0
            }
        }
    }

    /// Run periodic sync in the background.
    pub async fn run_periodic(self: Arc<Self>) {
        let mut ticker = interval(self.config.interval);

        info!("Starting periodic sync every {:?}", self.config.interval);

        loop {
            ticker.tick().await;

            if *self.cancel_token.read().await {
                info!("Periodic sync stopped");
                break;
            }

            match self.sync_once().await {
                Ok(result) => {
                    info!(
                        "Periodic sync completed: {} documents",
                        result.documents_written
                    );
                }
                Err(e) => {
                    error!("Periodic sync failed: {}", e);
                }
            }
        }
    }
}
