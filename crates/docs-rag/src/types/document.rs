//! Chunk and index point types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Payload keys owned by the ingestion pipeline
pub const RESERVED_PAYLOAD_KEYS: [&str; 3] = ["chunk", "filename", "chunkIndex"];

/// A bounded span of source text produced by the segmenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text (space-joined sentence units)
    pub text: String,
    /// Emission order within the source document
    pub index: usize,
    /// Source document identifier (the filename)
    pub source_id: String,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, index: usize, source_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            index,
            source_id: source_id.into(),
        }
    }

    /// Deterministic point id for this chunk
    ///
    /// Re-ingesting an identical document yields identical ids, so the
    /// index upsert overwrites instead of duplicating.
    pub fn point_id(&self) -> Uuid {
        let name = format!("{}\u{1f}{}\u{1f}{}", self.source_id, self.index, self.text);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }
}

/// Payload stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    /// Chunk text
    #[serde(default)]
    pub chunk: String,
    /// Source document identifier
    #[serde(rename = "filename", default)]
    pub source_id: String,
    /// Chunk position within the source
    #[serde(rename = "chunkIndex", default)]
    pub chunk_index: usize,
    /// Caller supplied metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PointPayload {
    /// Build a payload for a chunk, dropping extra keys that shadow reserved ones
    pub fn from_chunk(chunk: &Chunk, extra: &Map<String, Value>) -> Self {
        let extra = extra
            .iter()
            .filter(|(key, _)| !RESERVED_PAYLOAD_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            chunk: chunk.text.clone(),
            source_id: chunk.source_id.clone(),
            chunk_index: chunk.index,
            extra,
        }
    }

    /// Look up a payload field the way the index filter sees it
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "chunk" => Some(Value::String(self.chunk.clone())),
            "filename" => Some(Value::String(self.source_id.clone())),
            "chunkIndex" => Some(Value::from(self.chunk_index as u64)),
            other => self.extra.get(other).cloned(),
        }
    }
}

/// A vector plus payload, addressed by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPoint {
    /// Point id
    pub id: Uuid,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Stored payload
    pub payload: PointPayload,
}

/// A similarity search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Payload of the matched point
    pub payload: PointPayload,
    /// Similarity score (cosine, higher is better; may exceed 1.0 after hybrid boost)
    pub score: f32,
}
