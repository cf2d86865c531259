//! Response types

use serde::{Deserialize, Serialize};

use super::filter::FilterSet;

/// A chunk selected for the answer, with the score it was selected by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChunk {
    /// Chunk text
    pub chunk: String,
    /// Relevance score
    #[serde(default)]
    pub score: f32,
}

/// Response from the query pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Answer text (never empty)
    pub answer: String,
    /// Served from the answer cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Nothing relevant was retrieved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_context: Option<bool>,
    /// Greeting short-circuit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting: Option<bool>,
    /// Chunks the answer was built from, when the re-rank stage ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranked_chunks: Option<Vec<RankedChunk>>,
    /// Filters applied to the search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_filters: Option<FilterSet>,
    /// Hybrid boost applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<bool>,
    /// Rewrite pass applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_applied: Option<bool>,
}

impl QueryResponse {
    /// Answer served from the cache
    pub fn from_cache(answer: String) -> Self {
        Self {
            answer,
            cached: Some(true),
            ..Default::default()
        }
    }

    /// Greeting short-circuit answer
    pub fn greeting(answer: String) -> Self {
        Self {
            answer,
            greeting: Some(true),
            ..Default::default()
        }
    }

    /// Answer produced without any retrieved context
    pub fn no_context(answer: String, filters: &FilterSet, hybrid: bool) -> Self {
        Self {
            answer,
            cached: Some(false),
            no_context: Some(true),
            used_filters: Some(filters.clone()),
            hybrid: Some(hybrid),
            ..Default::default()
        }
    }
}

/// Response from document ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// Human-readable summary
    pub message: String,
    /// Points written to the index
    pub stored: usize,
    /// Chunks produced by the segmenter
    pub chunks: usize,
    /// Source identifier the points were stored under
    pub source_id: String,
}

impl IngestResponse {
    pub fn new(stored: usize, chunks: usize, source_id: String) -> Self {
        Self {
            message: format!("{} chunks stored", stored),
            stored,
            chunks,
            source_id,
        }
    }
}
