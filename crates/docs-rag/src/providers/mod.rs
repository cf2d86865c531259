//! Gateways to the external services: embeddings, vector index, cache and LLM
//!
//! Each concern is a trait so the pipelines hold `Arc<dyn ...>` handles and
//! tests can substitute fakes. Backends are selected from configuration.

pub mod cache;
pub mod embedding;
pub mod gemini;
pub mod huggingface;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod qdrant;
pub mod redis_cache;
pub mod vector_store;

pub use cache::{AnswerCache, CacheStore};
pub use embedding::EmbeddingProvider;
pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceEmbedder;
pub use llm::{Completion, GenerationOptions, LanguageModel, LlmProvider, GENERATION_FAILED};
pub use memory::{MemoryCache, MemoryIndex};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use qdrant::QdrantIndex;
pub use redis_cache::RedisCache;
pub use vector_store::VectorIndex;
