//! Redis cache backend

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use crate::error::{Error, Result};

use super::cache::CacheStore;

/// Keys deleted per DEL command when clearing namespaces
const DELETE_BATCH: usize = 500;

/// Redis-backed cache store
///
/// The connection manager multiplexes every request over one connection
/// and reconnects on its own after failures.
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis (`redis://` or `rediss://`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Config(format!("Invalid Redis URL: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::cache(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!("Connected to Redis");
        Ok(Self { manager })
    }
}

/// Expiry in whole seconds; Redis rejects zero
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|e| Error::cache(format!("GET failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, expiry_secs(ttl))
            .await
            .map_err(|e| Error::cache(format!("SET failed: {}", e)))
    }

    async fn clear_namespaces(&self, prefixes: &[&str]) -> Result<usize> {
        let mut conn = self.manager.clone();
        let mut keys: Vec<String> = Vec::new();

        for prefix in prefixes {
            let pattern = format!("{}*", prefix);
            let mut iter = conn
                .scan_match::<_, String>(&pattern)
                .await
                .map_err(|e| Error::cache(format!("SCAN failed: {}", e)))?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        let mut removed = 0usize;
        for batch in keys.chunks(DELETE_BATCH) {
            let deleted: usize = conn
                .del(batch)
                .await
                .map_err(|e| Error::cache(format!("DEL failed: {}", e)))?;
            removed += deleted;
        }

        Ok(removed)
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_secs() {
        assert_eq!(expiry_secs(Duration::from_secs(3600)), 3600);
        assert_eq!(expiry_secs(Duration::from_millis(10)), 1);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = RedisCache::connect("not-a-url").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
