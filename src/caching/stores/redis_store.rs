//! # Redis Cache Store
//!
//! Redis-backed cache using a multiplexed `ConnectionManager`, which reconnects on
//! its own after a dropped connection. Commands are not retried here: a failed
//! lookup is reported to the caller straight away.

use super::CacheStore;
use crate::caching::{CacheError, CacheResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Redis cache implementation
pub struct RedisCache {
    /// Redis connection manager
    connection_manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis
    pub async fn new(config: RedisCacheConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str())?;

        let connection_manager =
            tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| CacheError::Timeout)??;

        info!("Redis cache connected to {}", config.url);

        Ok(Self { connection_manager })
    }
}

/// `SETEX` rejects zero, and sub-second TTLs would otherwise round down to it
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<String> = conn.get(key).await?;

        match &value {
            Some(_) => debug!("Redis cache hit for key: {}", key),
            None => debug!("Redis cache miss for key: {}", key),
        }

        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection_manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl)).await?;

        debug!("Set Redis cache key: {} with TTL: {:?}", key, ttl);
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.connection_manager.clone();
        let response: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(response == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_seconds_never_zero() {
        assert_eq!(ttl_seconds(Duration::from_secs(300)), 300);
        assert_eq!(ttl_seconds(Duration::from_millis(200)), 1);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let config = RedisCacheConfig {
            url: "not a redis url".to_string(),
            ..Default::default()
        };
        assert!(RedisCache::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_fast() {
        let config = RedisCacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connection_timeout: Duration::from_secs(2),
        };
        assert!(RedisCache::new(config).await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires a Redis server on localhost:6379
    async fn test_basic_operations() {
        let cache = RedisCache::new(RedisCacheConfig::default()).await.unwrap();

        cache
            .set_with_ttl("shl:test", "[]", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("shl:test").await.unwrap().as_deref(), Some("[]"));
        assert!(cache.health_check().await.unwrap());
    }
}
