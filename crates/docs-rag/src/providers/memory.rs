//! In-process index and cache backends for development and tests

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{FilterSet, IndexedPoint, SearchHit};

use super::cache::CacheStore;
use super::vector_store::VectorIndex;

/// Cosine similarity between two vectors of equal length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Brute-force cosine index held in memory
#[derive(Default)]
pub struct MemoryIndex {
    dimensions: RwLock<Option<usize>>,
    points: RwLock<HashMap<Uuid, IndexedPoint>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Stored point by id
    pub fn get(&self, id: &Uuid) -> Option<IndexedPoint> {
        self.points.read().get(id).cloned()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let mut current = self.dimensions.write();
        match *current {
            Some(existing) if existing != dimensions => Err(Error::vector_db(format!(
                "Collection exists with {} dimensions, requested {}",
                existing, dimensions
            ))),
            Some(_) => Ok(()),
            None => {
                *current = Some(dimensions);
                Ok(())
            }
        }
    }

    async fn upsert(&self, points: &[IndexedPoint]) -> Result<()> {
        let dimensions = (*self.dimensions.read())
            .ok_or_else(|| Error::vector_db("Collection has not been created"))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != dimensions) {
            return Err(Error::vector_db(format!(
                "Vector dimension error: expected {}, got {}",
                dimensions,
                bad.vector.len()
            )));
        }

        let mut stored = self.points.write();
        for point in points {
            stored.insert(point.id, point.clone());
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize, filters: &FilterSet) -> Result<Vec<SearchHit>> {
        if self.dimensions.read().is_none() {
            return Err(Error::vector_db("Collection has not been created"));
        }

        let stored = self.points.read();
        let mut hits: Vec<SearchHit> = stored
            .values()
            .filter(|point| filters.matches(&point.payload))
            .map(|point| SearchHit {
                payload: point.payload.clone(),
                score: cosine_similarity(vector, &point.vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Expiring key-value map held in memory
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires)| *expires > now);
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let hit = self.entries.get(key).and_then(|entry| {
            let (value, expires) = entry.value();
            (*expires > Instant::now()).then(|| value.clone())
        });

        if hit.is_none() {
            self.entries.remove_if(key, |_, (_, expires)| *expires <= Instant::now());
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.evict_expired();
            if self.entries.len() >= self.max_entries {
                // Still full: drop whichever entry expires first
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|entry| entry.value().1)
                    .map(|entry| entry.key().clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }

        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn clear_namespaces(&self, prefixes: &[&str]) -> Result<usize> {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| !prefixes.iter().any(|prefix| key.starts_with(prefix)));
        Ok(before - self.entries.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
