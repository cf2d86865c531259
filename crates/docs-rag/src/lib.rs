//! docs-rag: question answering over ingested documents
//!
//! Documents are split into sentence-aware, overlapping chunks, embedded and
//! stored in a vector index. Questions are answered by retrieving similar
//! chunks (optionally keyword-boosted), re-ranking them with the language
//! model and generating a grounded answer. Answers and question embeddings
//! are cached best-effort.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod query;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::{IngestPipeline, Segmenter};
pub use query::QueryPipeline;
pub use server::{router, state::AppState, RagServer};
pub use types::{Chunk, FilterSet, IngestResponse, QueryRequest, QueryResponse};
