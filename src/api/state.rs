use std::sync::Arc;

use crate::storage::DocumentStore;
use crate::sync::HeroSync;

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<HeroSync>,
    pub store: Arc<dyn DocumentStore>,
    pub collection: String,
}

impl AppState {
    /// Serve the collection `sync` writes to, from the same store.
    pub fn new(sync: Arc<HeroSync>) -> Self {
        Self {
            store: sync.store().clone(),
            collection: sync.collection().to_string(),
            sync,
        }
    }
}
