//! Configuration for the RAG service
//!
//! Every section has a `Default` reproducing the stock deployment (Qdrant
//! collection `docs`, 384-dim MiniLM embeddings, Gemini answers, Redis cache
//! with a one hour TTL). A TOML file can override any subset of fields and
//! a handful of environment variables override the file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main RAG service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding provider configuration
    pub embeddings: EmbeddingConfig,
    /// Language model configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub vector_db: VectorDbConfig,
    /// Answer/embedding cache configuration
    pub cache: CacheConfig,
    /// Segmenter configuration
    pub chunking: ChunkingConfig,
    /// Query pipeline configuration
    pub query: QueryConfig,
    /// Ingestion pipeline configuration
    pub ingestion: IngestionConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Overlay values from the environment
    ///
    /// The lookup is injected so tests don't have to mutate process state.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.vector_db.url = url;
        }
        if let Some(key) = lookup("QDRANT_API_KEY") {
            self.vector_db.api_key = Some(key);
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.cache.url = url;
        }
        if let Some(token) = lookup("HF_TOKEN") {
            self.embeddings.api_token = Some(token);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            if self.embeddings.backend == EmbeddingBackend::Ollama {
                self.embeddings.base_url = Some(url.clone());
            }
            if self.llm.backend == LlmBackend::Ollama {
                self.llm.base_url = Some(url);
            }
        }
    }

    /// Reject configurations the pipelines cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".into()));
        }
        if self.chunking.max_tokens == 0 {
            return Err(Error::Config("chunking.max_tokens must be positive".into()));
        }
        if self.ingestion.upsert_batch_size == 0 {
            return Err(Error::Config("ingestion.upsert_batch_size must be positive".into()));
        }
        if self.query.max_limit == 0 || self.query.default_limit > self.query.max_limit {
            return Err(Error::Config(
                "query.default_limit must be between 1 and query.max_limit".into(),
            ));
        }
        if self.vector_db.collection.trim().is_empty() {
            return Err(Error::Config("vector_db.collection must not be empty".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 25MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5111,
            enable_cors: true,
            max_upload_size: 25 * 1024 * 1024,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Hugging Face Inference feature-extraction
    #[default]
    HuggingFace,
    /// Local Ollama server
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend provider
    pub backend: EmbeddingBackend,
    /// Model to use (backend default when unset)
    pub model: Option<String>,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Provider base URL (backend default when unset)
    pub base_url: Option<String>,
    /// Bearer token (Hugging Face)
    pub api_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::HuggingFace,
            model: None,
            dimensions: 384,
            base_url: None,
            api_token: None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Configured model, or the backend's stock model
    pub fn model(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(model), _) => model,
            (None, EmbeddingBackend::HuggingFace) => "sentence-transformers/all-MiniLM-L6-v2",
            (None, EmbeddingBackend::Ollama) => "all-minilm",
        }
    }

    /// Configured base URL, or the backend's stock endpoint
    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.backend) {
            (Some(url), _) => url,
            (None, EmbeddingBackend::HuggingFace) => "https://router.huggingface.co/hf-inference/models",
            (None, EmbeddingBackend::Ollama) => OLLAMA_URL,
        }
    }
}

/// Default local Ollama endpoint
const OLLAMA_URL: &str = "http://localhost:11434";

/// Language model backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Google Gemini (Generative Language API)
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider
    pub backend: LlmBackend,
    /// Generation model name (backend default when unset)
    pub model: Option<String>,
    /// Provider base URL (backend default when unset)
    pub base_url: Option<String>,
    /// API key (Gemini)
    pub api_key: Option<String>,
    /// Temperature for answer generation
    pub temperature: f32,
    /// Reasoning token budget; 0 disables thinking on models that support it
    pub thinking_budget: Option<u32>,
    /// Maximum output tokens per call
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Gemini,
            model: None,
            base_url: None,
            api_key: None,
            temperature: 0.4,
            thinking_budget: Some(0),
            max_output_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Configured model, or the backend's stock model
    pub fn model(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(model), _) => model,
            (None, LlmBackend::Gemini) => "gemini-2.5-flash",
            (None, LlmBackend::Ollama) => "llama3.2",
        }
    }

    /// Configured base URL, or the backend's stock endpoint
    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.backend) {
            (Some(url), _) => url,
            (None, LlmBackend::Gemini) => "https://generativelanguage.googleapis.com/v1beta",
            (None, LlmBackend::Ollama) => OLLAMA_URL,
        }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Qdrant over its REST API
    #[default]
    Qdrant,
    /// In-process brute-force index (development only, not persisted)
    Memory,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Backend provider
    pub backend: VectorBackend,
    /// Qdrant base URL
    pub url: String,
    /// Qdrant API key
    pub api_key: Option<String>,
    /// Collection name
    pub collection: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "docs".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Redis
    #[default]
    Redis,
    /// In-process map with expiry
    Memory,
    /// No cache; every lookup misses
    Disabled,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend provider
    pub backend: CacheBackend,
    /// Redis connection URL (`rediss://` for TLS)
    pub url: String,
    /// Time-to-live for both namespaces, in seconds
    pub ttl_secs: u64,
    /// Per-operation timeout in seconds
    pub timeout_secs: u64,
    /// Maximum entries for the in-memory backend
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
            ttl_secs: 3600,
            timeout_secs: 2,
            max_entries: 10_000,
        }
    }
}

/// Segmenter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Approximate token budget per chunk
    pub max_tokens: usize,
    /// Approximate token budget carried over between chunks
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            overlap_tokens: 30,
        }
    }
}

/// Query pipeline flavour
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Greeting intercept and persona-framed fallback answers
    #[default]
    Persona,
    /// No greeting intercept; fixed text when nothing is retrieved
    ///
    /// The fixed "No relevant context found." answer admits the miss instead
    /// of redirecting the user the way the persona mode does. Pick this mode
    /// only where callers expect that literal.
    Plain,
}

/// How greeting keywords are matched against a question
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GreetingMatch {
    /// Whole words or contiguous word runs: "hi" matches "Hi there", not "this"
    #[default]
    Word,
    /// Plain substring of the lower-cased question: "hey" also matches "heyyy"
    Substring,
}

/// Query pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Pipeline flavour
    pub mode: PipelineMode,
    /// Re-rank candidates with the LLM unless the request says otherwise
    pub rerank: bool,
    /// Default number of chunks used for the answer
    pub default_limit: usize,
    /// Largest accepted `limit`
    pub max_limit: usize,
    /// Minimum number of neighbours fetched from the index
    pub over_fetch: usize,
    /// Candidates kept after the score filter
    pub max_candidates: usize,
    /// Score bonus per question token found in a chunk
    pub hybrid_boost: f32,
    /// Greeting keywords (single words or phrases)
    pub greeting_keywords: Vec<String>,
    /// Greetings longer than this many words go through retrieval
    pub greeting_max_words: usize,
    /// Keyword matching rule
    pub greeting_match: GreetingMatch,
    /// Name the assistant introduces itself with
    pub assistant_name: String,
    /// Who the assistant says developed it
    pub developer: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Persona,
            rerank: true,
            default_limit: 5,
            max_limit: 50,
            over_fetch: 30,
            max_candidates: 15,
            hybrid_boost: 0.02,
            greeting_keywords: [
                "hi",
                "hello",
                "hey",
                "hiya",
                "howdy",
                "greetings",
                "good morning",
                "good afternoon",
                "good evening",
                "what's up",
                "salam",
                "selam",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            greeting_max_words: 6,
            greeting_match: GreetingMatch::Word,
            assistant_name: "Docs Assistant".to_string(),
            developer: "the docs-rag team".to_string(),
        }
    }
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Source id used when a text upload carries no filename
    pub default_source_id: String,
    /// Concurrent embedding calls per document (default: CPU count, max 8)
    pub parallel_embeddings: Option<usize>,
    /// Points per upsert request
    pub upsert_batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            default_source_id: "user_text.txt".to_string(),
            parallel_embeddings: None,
            upsert_batch_size: 64,
        }
    }
}

impl IngestionConfig {
    /// Effective embedding concurrency
    pub fn embedding_concurrency(&self) -> usize {
        self.parallel_embeddings
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }
}
