use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::HeroId;
use crate::storage::Document;

#[derive(Debug, Serialize)]
pub struct HeroDocument {
    pub id: String,
    #[serde(flatten)]
    pub fields: Document,
}

impl HeroDocument {
    /// The document key is the `id`; a stored `id` field is dropped.
    pub fn new(id: String, mut fields: Document) -> Self {
        fields.remove("id");
        Self { id, fields }
    }
}

#[derive(Debug, Serialize)]
pub struct HeroListResponse {
    pub total: usize,
    pub heroes: Vec<HeroDocument>,
}

pub async fn list_heroes(
    State(state): State<AppState>,
) -> Result<Json<HeroListResponse>, ApiError> {
    let heroes: Vec<HeroDocument> = state
        .store
        .list(&state.collection)
        .await?
        .into_iter()
        .map(|(id, fields)| HeroDocument::new(id, fields))
        .collect();

    Ok(Json(HeroListResponse {
        total: heroes.len(),
        heroes,
    }))
}

pub async fn get_hero(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HeroDocument>, ApiError> {
    let hero_id: HeroId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid hero id: {}", id)))?;
    let key = hero_id.doc_key();

    let fields = state
        .store
        .get(&state.collection, &key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Hero {}", key)))?;

    Ok(Json(HeroDocument::new(key, fields)))
}
