//! Cache store trait and the best-effort answer cache built on it

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retrieval::keys::NAMESPACES;

/// Trait for an expiring key-value store
///
/// Implementations:
/// - `RedisCache`: Redis via a multiplexed connection manager
/// - `MemoryCache`: in-process map
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value with a time-to-live, overwriting any previous value
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete every key starting with one of `prefixes`, returning how many went
    async fn clear_namespaces(&self, prefixes: &[&str]) -> Result<usize>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Best-effort cache for embeddings and answers
///
/// Lookups and stores never fail: an unavailable, slow, or absent store
/// behaves as a permanent miss and the failure is logged.
#[derive(Clone)]
pub struct AnswerCache {
    store: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
    timeout: Duration,
}

impl AnswerCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store: Some(store),
            ttl,
            timeout,
        }
    }

    /// A cache that always misses
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl: Duration::ZERO,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn backend(&self) -> &str {
        self.store.as_ref().map(|s| s.name()).unwrap_or("disabled")
    }

    /// Run a store operation under the per-call timeout
    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::cache(format!("timed out after {:?}", self.timeout))),
        }
    }

    /// Cached text for `key`, if any
    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match self.bounded(store.get(key)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Cache read failed for '{}', treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Store text under `key` with the configured TTL
    pub async fn put(&self, key: &str, value: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = self.bounded(store.set(key, value, self.ttl)).await {
            tracing::warn!("Cache write failed for '{}': {}", key, e);
        }
    }

    /// Cached embedding for `key`; undecodable entries count as misses
    pub async fn get_vector(&self, key: &str) -> Option<Vec<f32>> {
        let raw = self.get(key).await?;
        match serde_json::from_str::<Vec<f32>>(&raw) {
            Ok(vector) if !vector.is_empty() => Some(vector),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Discarding undecodable cached embedding '{}': {}", key, e);
                None
            }
        }
    }

    /// Store an embedding as a JSON array
    pub async fn put_vector(&self, key: &str, vector: &[f32]) {
        match serde_json::to_string(vector) {
            Ok(raw) => self.put(key, &raw).await,
            Err(e) => tracing::warn!("Failed to encode embedding for '{}': {}", key, e),
        }
    }

    /// Drop every embedding and answer entry
    ///
    /// Unlike lookups this is an explicit operation, so failures are reported.
    pub async fn clear(&self) -> Result<usize> {
        let Some(store) = self.store.as_ref() else {
            return Ok(0);
        };
        let removed = self.bounded(store.clear_namespaces(&NAMESPACES)).await?;
        tracing::info!("Cleared {} cache entries from {}", removed, store.name());
        Ok(removed)
    }
}
