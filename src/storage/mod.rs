//! Local persistence.
//!
//! Handles reading and writing under the data directory:
//! - Document collections as JSONL files
//! - Client-local key/value state (recent searches)

mod documents;
mod jsonl;
mod local;

pub use documents::*;
pub use jsonl::*;
pub use local::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt record at {path}:{line}: {source}")]
    CorruptLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Commit rejected: {0}")]
    Rejected(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn collections_dir(&self) -> PathBuf {
        self.data_dir.join("collections")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    /// File backing the client-local key/value store.
    pub fn local_store_path(&self) -> PathBuf {
        self.state_dir().join("local_storage.json")
    }

    /// Default hero reference file.
    pub fn heroes_path(&self) -> PathBuf {
        self.data_dir.join("heroes.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
