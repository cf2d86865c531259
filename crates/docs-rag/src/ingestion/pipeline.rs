//! Ingestion pipeline: segment, embed, upsert

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ChunkingConfig, IngestionConfig};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::{IndexedPoint, IngestResponse, PointPayload, RESERVED_PAYLOAD_KEYS};

use super::segmenter::Segmenter;

/// Persists documents into the vector index
pub struct IngestPipeline {
    segmenter: Segmenter,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    /// Concurrent embedding calls per document
    concurrency: usize,
    /// Points per upsert request
    batch_size: usize,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        chunking: &ChunkingConfig,
        ingestion: &IngestionConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            segmenter: Segmenter::new(chunking.max_tokens, chunking.overlap_tokens),
            embedder,
            index,
            concurrency: ingestion.embedding_concurrency(),
            batch_size: ingestion.upsert_batch_size.max(1),
        }
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Ingest `text` under `source_id`
    ///
    /// Chunks whose embedding comes back empty are skipped. Any embedding or
    /// index error aborts the document; points already upserted by earlier
    /// batches stay in place and are overwritten on retry (ids are stable).
    pub async fn ingest(
        &self,
        text: &str,
        source_id: &str,
        extra: &Map<String, Value>,
    ) -> Result<IngestResponse> {
        if text.trim().is_empty() {
            return Err(Error::invalid_request("Text required"));
        }

        let start = Instant::now();
        for key in extra.keys().filter(|k| RESERVED_PAYLOAD_KEYS.contains(&k.as_str())) {
            tracing::warn!("Ignoring reserved metadata key '{}' for {}", key, source_id);
        }

        let chunks = self.segmenter.segment(text, source_id);
        let total = chunks.len();

        // The stream owns its inputs; borrowed items make the future non-Send
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings: Vec<Vec<f32>> = stream::iter(texts.into_iter().map(|text| {
            let embedder = Arc::clone(&self.embedder);
            async move { embedder.embed(&text).await }
        }))
        .buffered(self.concurrency)
        .try_collect()
        .await
        .map_err(|e| {
            tracing::error!("Embedding failed while ingesting {}: {}", source_id, e);
            e
        })?;

        let points: Vec<IndexedPoint> = chunks
            .iter()
            .zip(embeddings)
            .filter(|(_, vector)| !vector.is_empty())
            .map(|(chunk, vector)| IndexedPoint {
                id: chunk.point_id(),
                vector,
                payload: PointPayload::from_chunk(chunk, extra),
            })
            .collect();

        let skipped = total - points.len();
        if skipped > 0 {
            tracing::warn!("Skipped {} chunks of {} with empty embeddings", skipped, source_id);
        }

        for batch in points.chunks(self.batch_size) {
            self.index.upsert(batch).await?;
        }

        tracing::info!(
            "Ingested {}: {} chunks, {} stored in {:?}",
            source_id,
            total,
            points.len(),
            start.elapsed()
        );

        Ok(IngestResponse::new(points.len(), total, source_id.to_string()))
    }
}
