//! # Cache Stores Module
//!
//! This module provides the cache store implementations: Redis for shared
//! deployments and an in-memory store with the same TTL semantics.

pub mod memory;
pub mod redis_store;

pub use memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis_store::{RedisCache, RedisCacheConfig};

use super::CacheResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Cache entry with its expiry deadline
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The serialized value
    pub value: String,

    /// When the entry stops being served
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if the entry is expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Key-value store with per-key expiry
///
/// Values are serialized response bodies. Callers need no compare-and-set or
/// transactional semantics: the last write to a key wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value, `None` when absent or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Perform health check
    async fn health_check(&self) -> CacheResult<bool>;
}
