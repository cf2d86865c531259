//! API routes for the RAG server

pub mod cache;
pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post},
    Json, Router,
};
use crate::server::state::AppState;

/// Build all routes under `/api/rag`
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/ingest-text", post(ingest::ingest_text))
        // PDF uploads get a larger body limit
        .route(
            "/ingest-pdf",
            post(ingest::ingest_pdf).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/query", post(query::query_rag))
        .route("/cache", delete(cache::clear_cache))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    let query = state.query();

    Json(serde_json::json!({
        "name": "docs-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over ingested documents",
        "mode": query.mode(),
        "endpoints": {
            "POST /api/rag/ingest-text": "Chunk, embed and index raw text",
            "POST /api/rag/ingest-pdf": "Extract, chunk, embed and index a PDF (field 'pdf')",
            "POST /api/rag/query": "Answer a question from the indexed documents",
            "DELETE /api/rag/cache": "Drop cached answers and embeddings",
            "GET /api/rag/info": "This document"
        },
        "backends": {
            "embeddings": format!("{:?}", config.embeddings.backend),
            "embedding_model": config.embeddings.model(),
            "dimensions": config.embeddings.dimensions,
            "llm": query.llm().provider_name(),
            "llm_model": query.llm().model(),
            "vector_index": format!("{:?}", config.vector_db.backend),
            "collection": config.vector_db.collection,
            "cache": query.cache().backend()
        },
        "ready": state.is_ready()
    }))
}
