//! # SHL Proxy
//!
//! A read-through caching proxy in front of the SHL statistics API. Clients call
//! simple resource endpoints (`/standings`, `/games`, `/goalies`, `/players`,
//! `/winstreaks`); the proxy answers from the cache when it can and otherwise
//! fetches, formats and caches fresh data.
//!
//! Every response body is an envelope `{ "source": "cache" | "api", "data": ... }`
//! whose `data` has the same schema regardless of source.

/// Error type, configuration and the response envelope
pub mod core;

/// Cache stores, resource keys and the in-flight registry
pub mod caching;

/// Statistics API client and the provider trait
pub mod upstream;

/// Pure transformations from upstream records to response shapes
pub mod formatter;

/// Cache-aside orchestration per resource
pub mod handler;

/// Routes, middleware layers and the HTTP/HTTPS listeners
pub mod gateway;

/// Structured logging and Prometheus metrics
pub mod observability;

pub use self::core::config::ProxyConfig;
pub use self::core::error::{ProxyError, ProxyResult};
pub use self::core::types::{Envelope, Source};
pub use gateway::{AppState, ProxyServer};
pub use handler::{HandlerSettings, RequestHandler};
