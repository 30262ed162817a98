//! # Caching System Module
//!
//! Cache-aside support for the proxy: the request handler reads a resource key,
//! and on a miss writes the freshly formatted payload back with a TTL.
//!
//! ## Architecture
//! 1. **Cache Stores**: Redis for production, an in-memory store for tests and
//!    single-instance deployments. Both implement [`CacheStore`].
//! 2. **Key Generator**: builds the namespaced resource keys (`shl:standings`).
//! 3. **Deduplication**: an in-flight registry so concurrent misses on one key share
//!    a single upstream fetch.
//!
//! ## Usage Example
//! ```rust,ignore
//! use std::time::Duration;
//! use shl_proxy::caching::{CacheStore, InMemoryCache, InMemoryCacheConfig};
//!
//! let cache = InMemoryCache::new(InMemoryCacheConfig::default());
//! cache.set_with_ttl("shl:standings", "[]", Duration::from_secs(300)).await?;
//! assert_eq!(cache.get("shl:standings").await?.as_deref(), Some("[]"));
//! ```

pub mod deduplication;
pub mod key_generator;
pub mod stores;

pub use deduplication::{DeduplicationManager, Flight, FlightFollower, FlightLeader, FlightOutcome};
pub use key_generator::{KeyGenerationStrategy, ResourceKeyGenerator, ResourceKind};
pub use stores::{CacheEntry, CacheStore, InMemoryCache, InMemoryCacheConfig, RedisCache, RedisCacheConfig};

use std::sync::Arc;
use tracing::info;

use crate::core::config::{CacheBackend, CacheSettings};

/// Cache operation result
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache store error: {message}")]
    Store { message: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Cache not available")]
    Unavailable,
}

/// Build the cache store selected by the configuration
pub async fn connect(settings: &CacheSettings) -> CacheResult<Arc<dyn CacheStore>> {
    match settings.backend {
        CacheBackend::Redis => {
            let config = RedisCacheConfig {
                url: settings.redis_url.clone(),
                ..Default::default()
            };
            let cache = RedisCache::new(config).await?;
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            info!("Using in-memory cache store");
            Ok(Arc::new(InMemoryCache::new(InMemoryCacheConfig::default())))
        }
    }
}
