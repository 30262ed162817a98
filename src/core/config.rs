//! # Configuration Module
//!
//! The proxy is configured entirely from environment variables (a `.env` file is
//! loaded by the binary before this module runs). Defaults are applied first, then
//! every recognized variable overrides its field, and finally the whole
//! configuration is validated with all problems reported in a single error.
//!
//! ## Recognized Variables
//! - `CLIENT_ID`, `CLIENT_SECRET`: statistics API credentials (required)
//! - `PORT`: HTTP listen port
//! - `CACHE_LIFESPAN`: TTL in seconds shared by every cache entry
//! - `NODE_ENV`: `development` allows every CORS origin and skips the TLS listener
//! - `SEASON`, `REDIS_URL`, `CACHE_BACKEND`, `CACHE_KEY_PREFIX`, `CACHE_KEY_INCLUDE_SEASON`
//! - `SHL_API_URL`, `UPSTREAM_TIMEOUT`, `UPSTREAM_RETRY_BACKOFF`
//! - `CORS_ALLOWED_ORIGINS`, `TLS_PORT`, `TLS_CERT_PATH`, `TLS_KEY_PATH`
//! - `LOG_FORMAT`, `METRICS_ENABLED`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::caching::KeyGenerationStrategy;
use crate::core::error::{ProxyError, ProxyResult};
use crate::observability::LogFormat;

/// Main proxy configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Listeners, CORS and TLS
    pub server: ServerSettings,

    /// Cache backend and entry lifetime
    pub cache: CacheSettings,

    /// Statistics API connection
    pub upstream: UpstreamSettings,

    /// Season every resource is fetched for
    pub season: u16,

    /// Log output format
    pub log_format: LogFormat,

    /// Expose Prometheus metrics on `/metrics`
    pub metrics_enabled: bool,
}

/// Deployment environment, from `NODE_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }
}

/// HTTP and HTTPS listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address both listeners bind to
    pub bind_address: String,

    /// Plain HTTP port
    pub port: u16,

    /// HTTPS port, only used outside development
    pub tls_port: u16,

    /// PEM certificate chain
    pub tls_cert_path: PathBuf,

    /// PEM private key
    pub tls_key_path: PathBuf,

    /// Origins allowed by CORS outside development
    pub allowed_origins: Vec<String>,

    pub environment: Environment,
}

impl ServerSettings {
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Whether the HTTPS listener should be started
    pub fn tls_enabled(&self) -> bool {
        !self.is_development()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            tls_port: 8443,
            tls_cert_path: PathBuf::from("./sslcert/fullchain.pem"),
            tls_key_path: PathBuf::from("./sslcert/privkey.pem"),
            allowed_origins: vec!["https://shl.zetterstrom.dev".to_string()],
            environment: Environment::Production,
        }
    }
}

/// Which cache store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Cache store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub backend: CacheBackend,

    /// Redis connection URL
    pub redis_url: String,

    /// Lifetime of every cache entry
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Namespace prepended to every resource key
    pub key_prefix: String,

    /// Put the season into the resource key
    pub include_season: bool,
}

impl CacheSettings {
    pub fn key_strategy(&self) -> KeyGenerationStrategy {
        if self.include_season {
            KeyGenerationStrategy::Seasoned
        } else {
            KeyGenerationStrategy::Simple
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            ttl: Duration::from_secs(300),
            key_prefix: "shl".to_string(),
            include_season: false,
        }
    }
}

/// Statistics API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,

    /// Per-attempt timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay before the single retry
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://openapi.shl.se".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_millis(250),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            cache: CacheSettings::default(),
            upstream: UpstreamSettings::default(),
            season: 2019,
            log_format: LogFormat::Json,
            metrics_enabled: true,
        }
    }
}

impl ProxyConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> ProxyResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> ProxyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> ProxyResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        // Upstream credentials
        if let Some(id) = var("CLIENT_ID") {
            self.upstream.client_id = id;
        }
        if let Some(secret) = var("CLIENT_SECRET") {
            self.upstream.client_secret = secret;
        }
        if let Some(url) = var("SHL_API_URL") {
            self.upstream.base_url = url;
        }
        if let Some(timeout) = var("UPSTREAM_TIMEOUT") {
            self.upstream.timeout = parse_duration("UPSTREAM_TIMEOUT", &timeout)?;
        }
        if let Some(backoff) = var("UPSTREAM_RETRY_BACKOFF") {
            self.upstream.retry_backoff = parse_duration("UPSTREAM_RETRY_BACKOFF", &backoff)?;
        }

        // Server
        if let Some(port) = var("PORT") {
            self.server.port = parse_number("PORT", &port)?;
        }
        if let Some(port) = var("TLS_PORT") {
            self.server.tls_port = parse_number("TLS_PORT", &port)?;
        }
        if let Some(path) = var("TLS_CERT_PATH") {
            self.server.tls_cert_path = PathBuf::from(path);
        }
        if let Some(path) = var("TLS_KEY_PATH") {
            self.server.tls_key_path = PathBuf::from(path);
        }
        if let Some(addr) = var("BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(env) = var("NODE_ENV") {
            self.server.environment = Environment::parse(&env);
        }
        if let Some(origins) = var("CORS_ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        // Cache
        if let Some(lifespan) = var("CACHE_LIFESPAN") {
            let seconds: u64 = parse_number("CACHE_LIFESPAN", &lifespan)?;
            self.cache.ttl = Duration::from_secs(seconds);
        }
        if let Some(url) = var("REDIS_URL") {
            self.cache.redis_url = url;
        }
        if let Some(backend) = var("CACHE_BACKEND") {
            self.cache.backend = match backend.to_lowercase().as_str() {
                "redis" => CacheBackend::Redis,
                "memory" => CacheBackend::Memory,
                other => {
                    return Err(ProxyError::config(format!(
                        "Invalid CACHE_BACKEND: {} (expected redis or memory)",
                        other
                    )))
                }
            };
        }
        if let Some(prefix) = var("CACHE_KEY_PREFIX") {
            self.cache.key_prefix = prefix;
        }
        if let Some(flag) = var("CACHE_KEY_INCLUDE_SEASON") {
            self.cache.include_season = parse_bool("CACHE_KEY_INCLUDE_SEASON", &flag)?;
        }

        if let Some(season) = var("SEASON") {
            self.season = parse_number("SEASON", &season)?;
        }

        // Observability
        if let Some(format) = var("LOG_FORMAT") {
            self.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(ProxyError::config(format!(
                        "Invalid LOG_FORMAT: {} (expected json or text)",
                        other
                    )))
                }
            };
        }
        if let Some(flag) = var("METRICS_ENABLED") {
            self.metrics_enabled = parse_bool("METRICS_ENABLED", &flag)?;
        }

        Ok(())
    }

    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> ProxyResult<()> {
        let mut errors = Vec::new();

        if self.upstream.client_id.is_empty() {
            errors.push("CLIENT_ID must be set".to_string());
        }
        if self.upstream.client_secret.is_empty() {
            errors.push("CLIENT_SECRET must be set".to_string());
        }
        if let Err(e) = Url::parse(&self.upstream.base_url) {
            errors.push(format!("SHL_API_URL is not a valid URL: {}", e));
        }
        if self.upstream.timeout.is_zero() {
            errors.push("UPSTREAM_TIMEOUT must be greater than 0".to_string());
        }

        // SETEX rejects a zero expiry
        if self.cache.ttl.as_secs() == 0 {
            errors.push("CACHE_LIFESPAN must be at least 1 second".to_string());
        }
        if self.cache.key_prefix.is_empty() {
            errors.push("CACHE_KEY_PREFIX cannot be empty".to_string());
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_empty() {
            errors.push("REDIS_URL cannot be empty when CACHE_BACKEND=redis".to_string());
        }

        if self.server.port == 0 {
            errors.push("PORT must be greater than 0".to_string());
        }
        if self.server.tls_enabled() && self.server.tls_port == self.server.port {
            errors.push("TLS_PORT must differ from PORT".to_string());
        }
        if !self.server.is_development() && self.server.allowed_origins.is_empty() {
            errors.push("CORS_ALLOWED_ORIGINS cannot be empty outside development".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProxyError::config(errors.join("; ")))
        }
    }
}

fn parse_number<T>(name: &str, value: &str) -> ProxyResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ProxyError::config(format!("Invalid {}: {}", name, e)))
}

fn parse_bool(name: &str, value: &str) -> ProxyResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProxyError::config(format!("Invalid {}: {}", name, other))),
    }
}

fn parse_duration(name: &str, value: &str) -> ProxyResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| ProxyError::config(format!("Invalid {}: {}", name, e)))
}
