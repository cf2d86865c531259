//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheBackend, EmbeddingBackend, LlmBackend, RagConfig, VectorBackend};
use crate::error::Result;
use crate::ingestion::IngestPipeline;
use crate::providers::{
    AnswerCache, CacheStore, EmbeddingProvider, GeminiClient, HuggingFaceEmbedder, LanguageModel, LlmProvider,
    MemoryCache, MemoryIndex, OllamaEmbedder, OllamaLlm, QdrantIndex, RedisCache, VectorIndex,
};
use crate::query::QueryPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Vector index, kept for provisioning
    index: Arc<dyn VectorIndex>,
    /// Document ingestion
    ingest: IngestPipeline,
    /// Question answering
    query: QueryPipeline,
    /// Set once the collection is provisioned
    ready: RwLock<bool>,
}

impl AppState {
    /// Build every gateway from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing RAG state (embeddings: {:?}, llm: {:?}, index: {:?}, cache: {:?})",
            config.embeddings.backend,
            config.llm.backend,
            config.vector_db.backend,
            config.cache.backend
        );

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
            EmbeddingBackend::HuggingFace => {
                if config.embeddings.api_token.is_none() {
                    tracing::warn!("No Hugging Face token configured (HF_TOKEN); requests may be rate limited");
                }
                Arc::new(HuggingFaceEmbedder::new(&config.embeddings)?)
            }
            EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(&config.embeddings)?),
        };

        let llm: Arc<dyn LlmProvider> = match config.llm.backend {
            LlmBackend::Gemini => Arc::new(GeminiClient::new(&config.llm)?),
            LlmBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
        };

        let index: Arc<dyn VectorIndex> = match config.vector_db.backend {
            VectorBackend::Qdrant => Arc::new(QdrantIndex::new(&config.vector_db)?),
            VectorBackend::Memory => {
                tracing::warn!("Using the in-memory vector index; nothing is persisted");
                Arc::new(MemoryIndex::new())
            }
        };

        let store: Option<Arc<dyn CacheStore>> = match config.cache.backend {
            CacheBackend::Redis => match RedisCache::connect(&config.cache.url).await {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    tracing::warn!("Redis unavailable, answering without a cache: {}", e);
                    None
                }
            },
            CacheBackend::Memory => Some(Arc::new(MemoryCache::new(config.cache.max_entries))),
            CacheBackend::Disabled => None,
        };

        Ok(Self::from_parts(config, embedder, index, store, llm))
    }

    /// Assemble state from already-built gateways
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Option<Arc<dyn CacheStore>>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let cache = match store {
            Some(store) => AnswerCache::new(
                store,
                Duration::from_secs(config.cache.ttl_secs),
                Duration::from_secs(config.cache.timeout_secs),
            ),
            None => AnswerCache::disabled(),
        };

        let ingest = IngestPipeline::new(
            &config.chunking,
            &config.ingestion,
            Arc::clone(&embedder),
            Arc::clone(&index),
        );
        let query = QueryPipeline::new(
            &config.query,
            config.llm.temperature,
            embedder,
            Arc::clone(&index),
            cache,
            LanguageModel::new(llm),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                index,
                ingest,
                query,
                ready: RwLock::new(false),
            }),
        }
    }

    /// Create the collection if needed and mark the service ready
    pub async fn provision(&self) -> Result<()> {
        let dimensions = self.inner.config.embeddings.dimensions;
        self.inner.index.ensure_collection(dimensions).await?;
        self.set_ready(true);
        tracing::info!(
            "Collection '{}' ready on {} ({} dims)",
            self.inner.config.vector_db.collection,
            self.inner.index.name(),
            dimensions
        );
        Ok(())
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the ingestion pipeline
    pub fn ingest(&self) -> &IngestPipeline {
        &self.inner.ingest
    }

    /// Get the query pipeline
    pub fn query(&self) -> &QueryPipeline {
        &self.inner.query
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingIndex, HashEmbedder, ScriptedLlm};

    #[tokio::test]
    async fn test_provision_marks_ready() {
        let mut config = RagConfig::default();
        config.embeddings.dimensions = HashEmbedder::DIMENSIONS;

        let state = AppState::from_parts(
            config,
            Arc::new(HashEmbedder::new()),
            Arc::new(MemoryIndex::new()),
            None,
            Arc::new(ScriptedLlm::constant("ok")),
        );

        assert!(!state.is_ready());
        state.provision().await.unwrap();
        assert!(state.is_ready());
        state.provision().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_provision_stays_unready() {
        let state = AppState::from_parts(
            RagConfig::default(),
            Arc::new(HashEmbedder::new()),
            CountingIndex::down(),
            None,
            Arc::new(ScriptedLlm::constant("ok")),
        );

        assert!(state.provision().await.is_err());
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_new_with_local_backends() {
        let mut config = RagConfig::default();
        config.vector_db.backend = VectorBackend::Memory;
        config.cache.backend = CacheBackend::Memory;
        config.llm.api_key = Some("key".to_string());

        let state = AppState::new(config).await.unwrap();
        assert!(state.query().cache().is_enabled());
        assert_eq!(state.query().llm().provider_name(), "gemini");
    }

    #[tokio::test]
    async fn test_gemini_requires_key() {
        let mut config = RagConfig::default();
        config.vector_db.backend = VectorBackend::Memory;
        config.cache.backend = CacheBackend::Disabled;

        assert!(AppState::new(config).await.is_err());
    }
}
