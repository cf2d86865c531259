//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `HuggingFaceEmbedder`: Hugging Face Inference (all-MiniLM-L6-v2)
/// - `OllamaEmbedder`: Local Ollama server
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    ///
    /// An empty vector means the provider had nothing to say about the text;
    /// callers skip such chunks. Empty input is rejected.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimensions (384 for MiniLM)
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Reject empty input before a provider call
pub(crate) fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("Text required".to_string()));
    }
    Ok(())
}

/// Check a provider vector against the configured width
///
/// Empty vectors pass through untouched.
pub(crate) fn check_dimensions(vector: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if !vector.is_empty() && vector.len() != expected {
        return Err(Error::embedding(format!(
            "Expected {} dimensions, got {}",
            expected,
            vector.len()
        )));
    }
    Ok(vector)
}
