//! Fakes for the gateway traits, shared by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::{
    CacheStore, EmbeddingProvider, GenerationOptions, LlmProvider, MemoryCache, MemoryIndex, VectorIndex,
};
use crate::types::{FilterSet, IndexedPoint, SearchHit};

/// Deterministic bag-of-words embedder
///
/// Each lower-cased word is hashed into one of `DIMENSIONS` buckets, so texts
/// sharing words point in similar directions.
#[derive(Default)]
pub struct HashEmbedder {
    empty_for: Option<String>,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub const DIMENSIONS: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    /// Return an empty vector for texts containing `marker`
    pub fn empty_for(mut self, marker: &str) -> Self {
        self.empty_for = Some(marker.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; Self::DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            vector[bucket as usize % Self::DIMENSIONS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("Text required".into()));
        }
        if matches!(&self.empty_for, Some(marker) if text.contains(marker.as_str())) {
            return Ok(Vec::new());
        }
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Embedder whose provider is always down
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("model is loading"))
    }

    fn dimensions(&self) -> usize {
        HashEmbedder::DIMENSIONS
    }

    fn name(&self) -> &str {
        "failing"
    }
}

type Script = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// LLM answering from a script, recording every prompt it sees
pub struct ScriptedLlm {
    script: Script,
    prompts: Mutex<Vec<(String, GenerationOptions)>>,
}

impl ScriptedLlm {
    pub fn new(script: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Same reply to every prompt
    pub fn constant(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Fails every call
    pub fn failing() -> Self {
        Self::new(|_| Err(Error::llm("quota exceeded")))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn options(&self) -> Vec<GenerationOptions> {
        self.prompts.lock().iter().map(|(_, o)| *o).collect()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.prompts.lock().push((prompt.to_string(), *options));
        (self.script)(prompt)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Memory index that counts calls and can be switched off
#[derive(Default)]
pub struct CountingIndex {
    inner: MemoryIndex,
    searches: AtomicUsize,
    upserts: AtomicUsize,
    down: bool,
}

impl CountingIndex {
    pub async fn ready() -> Arc<Self> {
        let index = Self::default();
        index
            .inner
            .ensure_collection(HashEmbedder::DIMENSIONS)
            .await
            .expect("memory collection");
        Arc::new(index)
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self {
            down: true,
            ..Default::default()
        })
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        if self.down {
            return Err(Error::vector_db("connection refused"));
        }
        self.inner.ensure_collection(dimensions).await
    }

    async fn upsert(&self, points: &[IndexedPoint]) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(Error::vector_db("connection refused"));
        }
        self.inner.upsert(points).await
    }

    async fn search(&self, vector: &[f32], limit: usize, filters: &FilterSet) -> Result<Vec<SearchHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(Error::vector_db("connection refused"));
        }
        self.inner.search(vector, limit, filters).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Memory cache that counts calls and can be switched off
pub struct CountingCache {
    inner: MemoryCache,
    gets: AtomicUsize,
    sets: AtomicUsize,
    down: bool,
}

impl CountingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCache::new(1000),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            down: false,
        })
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCache::new(1),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            down: true,
        })
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.ok().flatten()
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(Error::cache("connection refused"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(Error::cache("connection refused"));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn clear_namespaces(&self, prefixes: &[&str]) -> Result<usize> {
        if self.down {
            return Err(Error::cache("connection refused"));
        }
        self.inner.clear_namespaces(prefixes).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}
