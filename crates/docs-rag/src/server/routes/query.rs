//! Query endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/rag/query - Answer a question from the indexed documents
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    tracing::info!("Query: \"{}\"", request.question);

    let response = state.query().answer(&request).await?;

    tracing::info!(
        "Answered in {}ms (cached: {}, no_context: {}, greeting: {})",
        start.elapsed().as_millis(),
        response.cached.unwrap_or(false),
        response.no_context.unwrap_or(false),
        response.greeting.unwrap_or(false)
    );

    Ok(Json(response))
}
