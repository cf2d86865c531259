//! Hugging Face Inference embedding provider
//!
//! Calls the feature-extraction pipeline. Sentence-transformer models return
//! a pooled vector; plain encoders return one vector per token, which is
//! mean-pooled here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::{check_dimensions, require_text, EmbeddingProvider};

/// Hugging Face feature-extraction client
pub struct HuggingFaceEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_token: Option<String>,
    dimensions: usize,
}

#[derive(Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a str,
}

/// Shapes the feature-extraction endpoint answers with
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureResponse {
    Pooled(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
    Batched(Vec<Vec<Vec<f32>>>),
}

impl FeatureResponse {
    fn into_vector(self) -> Vec<f32> {
        match self {
            FeatureResponse::Pooled(vector) => vector,
            FeatureResponse::Tokens(tokens) => mean_pool(&tokens),
            FeatureResponse::Batched(batch) => batch
                .into_iter()
                .next()
                .map(|tokens| mean_pool(&tokens))
                .unwrap_or_default(),
        }
    }
}

/// Average token vectors into one sentence vector
fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let Some(width) = tokens.first().map(Vec::len) else {
        return Vec::new();
    };

    let mut pooled = vec![0.0f32; width];
    for token in tokens {
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }

    let count = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= count);
    pooled
}

impl HuggingFaceEmbedder {
    /// Create a new embedder from configuration
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            api_token: config.api_token.clone(),
            dimensions: config.dimensions,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/pipeline/feature-extraction", self.base_url, self.model)
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        require_text(text)?;

        let mut request = self
            .client
            .post(self.endpoint())
            .json(&FeatureRequest { inputs: text });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Hugging Face request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Hugging Face embedding failed ({}): {}",
                status, body
            )));
        }

        let features: FeatureResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse Hugging Face response: {}", e)))?;

        check_dimensions(features.into_vector(), self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
