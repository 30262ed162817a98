//! Core building blocks: error type, configuration, and the response envelope.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CacheBackend, CacheSettings, Environment, ProxyConfig, ServerSettings, UpstreamSettings};
pub use error::{ProxyError, ProxyResult};
pub use types::{Envelope, Source};
