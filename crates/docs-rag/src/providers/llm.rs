//! Language model provider trait and the fail-closed generation gateway

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Text returned in place of a model answer when generation fails
pub const GENERATION_FAILED: &str = "Failed to generate an answer from the language model.";

/// Per-call generation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Ask the provider for a repeatable completion (fixed seed, greedy decoding)
    pub deterministic: bool,
}

impl GenerationOptions {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            deterministic: false,
        }
    }

    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }
}

/// Trait for prompt completion
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API (gemini-2.5-flash)
/// - `OllamaLlm`: Local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model being used
    fn model(&self) -> &str;
}

/// Outcome of a gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Model text, or the failure sentinel
    pub text: String,
    /// True when the provider failed and `text` is the sentinel
    pub degraded: bool,
}

impl Completion {
    fn degraded() -> Self {
        Self {
            text: GENERATION_FAILED.to_string(),
            degraded: true,
        }
    }
}

/// Fail-closed wrapper around an [`LlmProvider`]
///
/// Generation never raises: any provider failure becomes the
/// [`GENERATION_FAILED`] sentinel with `degraded` set, and is logged.
#[derive(Clone)]
pub struct LanguageModel {
    provider: Arc<dyn LlmProvider>,
}

impl LanguageModel {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Generate a completion for `prompt`
    pub async fn generate(&self, prompt: &str, temperature: f32, deterministic: bool) -> Completion {
        let options = GenerationOptions::new(temperature).deterministic(deterministic);

        match self.provider.complete(prompt, &options).await {
            Ok(text) => Completion {
                text,
                degraded: false,
            },
            Err(e) => {
                tracing::error!(
                    "Generation failed ({} / {}): {}",
                    self.provider.name(),
                    self.provider.model(),
                    e
                );
                Completion::degraded()
            }
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }
}
