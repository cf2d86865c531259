//! Vector index trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FilterSet, IndexedPoint, SearchHit};

/// Trait for vector storage and filtered similarity search
///
/// Implementations:
/// - `QdrantIndex`: Qdrant over REST
/// - `MemoryIndex`: in-process brute-force cosine index
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if it does not exist yet (cosine metric)
    ///
    /// Safe to call repeatedly.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Insert or overwrite points by id
    async fn upsert(&self, points: &[IndexedPoint]) -> Result<()>;

    /// Nearest neighbours by descending cosine similarity
    ///
    /// Only points whose payload satisfies every constraint in `filters`
    /// are considered.
    async fn search(&self, vector: &[f32], limit: usize, filters: &FilterSet) -> Result<Vec<SearchHit>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
