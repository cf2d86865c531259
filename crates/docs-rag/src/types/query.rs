//! Request types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::filter::FilterSet;

/// Query request for the answer pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// The question to answer
    #[serde(default)]
    pub question: String,

    /// Field-equality filters applied to the index search
    #[serde(default)]
    pub filters: FilterSet,

    /// Number of chunks used for the answer (default: 5)
    #[serde(default)]
    pub limit: Option<usize>,

    /// Minimum similarity score (default: 0.0)
    #[serde(default)]
    pub min_score: f32,

    /// Add a lexical overlap bonus to vector scores
    #[serde(default)]
    pub hybrid: bool,

    /// Restyle the answer with a second generation call
    #[serde(default)]
    pub rewrite: bool,

    /// Re-rank candidates with the LLM (default: from config)
    #[serde(default)]
    pub rerank: Option<bool>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Restrict the search with filters
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Set the number of chunks used for the answer
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the similarity threshold
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Enable the hybrid keyword boost
    pub fn with_hybrid(mut self) -> Self {
        self.hybrid = true;
        self
    }

    /// Enable the rewrite pass
    pub fn with_rewrite(mut self) -> Self {
        self.rewrite = true;
        self
    }

    /// Override the re-rank toggle
    pub fn with_rerank(mut self, rerank: bool) -> Self {
        self.rerank = Some(rerank);
        self
    }
}

/// Plain-text ingestion request
///
/// Any field other than `text` and `filename` is kept as payload metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestTextRequest {
    /// Raw text to ingest
    #[serde(default)]
    pub text: String,

    /// Source identifier (default: from config)
    #[serde(default)]
    pub filename: Option<String>,

    /// Extra payload metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
