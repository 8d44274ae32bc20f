use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::sync::{SyncResponse, SyncState};

/// Run the batch job and report its outcome. Failures are reported in the
/// body, never as an error status.
pub async fn trigger_sync(State(state): State<AppState>) -> Json<SyncResponse> {
    Json(state.sync.run_once().await)
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub running: bool,
    #[serde(flatten)]
    pub state: SyncState,
}

pub async fn sync_status(State(state): State<AppState>) -> Json<SyncStatusResponse> {
    Json(SyncStatusResponse {
        running: state.sync.is_running().await,
        state: state.sync.state().await,
    })
}
