//! # In-Memory Cache Store
//!
//! A process-local cache with TTL support and periodic cleanup of expired entries.
//! Expired entries are never served, even if the cleanup task has not run yet.

use super::{CacheEntry, CacheStore};
use crate::caching::CacheResult;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

/// In-memory cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryCacheConfig {
    /// Cleanup interval for expired entries
    pub cleanup_interval: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// In-memory cache implementation
pub struct InMemoryCache {
    /// Cache entries storage
    entries: Arc<DashMap<String, CacheEntry>>,

    /// Cleanup task handle
    cleanup_task: JoinHandle<()>,
}

impl InMemoryCache {
    /// Create a new in-memory cache
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: InMemoryCacheConfig) -> Self {
        let entries = Arc::new(DashMap::new());

        let cleanup_task = {
            let entries = Arc::clone(&entries);
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = interval(cleanup_interval);
                loop {
                    interval.tick().await;
                    Self::cleanup_expired_entries(&entries);
                }
            })
        };

        Self {
            entries,
            cleanup_task,
        }
    }

    /// Number of stored entries, including expired ones not yet cleaned up
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cleanup_expired_entries(entries: &DashMap<String, CacheEntry>) {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let cleaned = before.saturating_sub(entries.len());

        if cleaned > 0 {
            debug!("Cleaned up {} expired cache entries", cleaned);
        }
    }
}

impl Drop for InMemoryCache {
    fn drop(&mut self) {
        self.cleanup_task.abort();
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            // Only drop the entry if no fresh write replaced it meanwhile
            self.entries.remove_if(key, |_, entry| entry.is_expired());
            debug!("Expired in-memory cache entry for key: {}", key);
        }

        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = CacheEntry::new(value.to_string(), ttl);
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(!self.cleanup_task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_basic_operations() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());

        cache
            .set_with_ttl("shl:standings", "[1,2]", Duration::from_secs(60))
            .await
            .unwrap();
        let result = cache.get("shl:standings").await.unwrap();
        assert_eq!(result.as_deref(), Some("[1,2]"));

        assert_eq!(cache.get("shl:games").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());
        let ttl = Duration::from_secs(60);

        cache.set_with_ttl("key", "first", ttl).await.unwrap();
        cache.set_with_ttl("key", "second", ttl).await.unwrap();

        assert_eq!(cache.get("key").await.unwrap().as_deref(), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());

        cache
            .set_with_ttl("expire_test", "value", Duration::from_millis(100))
            .await
            .unwrap();
        assert!(cache.get("expire_test").await.unwrap().is_some());

        sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("expire_test").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = InMemoryCache::new(InMemoryCacheConfig {
            cleanup_interval: Duration::from_millis(20),
        });

        cache
            .set_with_ttl("short", "value", Duration::from_millis(10))
            .await
            .unwrap();
        cache
            .set_with_ttl("long", "value", Duration::from_secs(60))
            .await
            .unwrap();

        sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_health_check() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());
        assert!(cache.health_check().await.unwrap());
    }
}
