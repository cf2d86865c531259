//! Cache maintenance endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

/// DELETE /api/rag/cache - Drop cached answers and question embeddings
pub async fn clear_cache(State(state): State<AppState>) -> Result<Json<ClearCacheResponse>> {
    let removed = state.query().cache().clear().await?;
    tracing::info!("Cleared {} cache entries", removed);
    Ok(Json(ClearCacheResponse { removed }))
}
