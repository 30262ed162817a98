//! # Error Handling Module
//!
//! This module defines the error type returned by every request path of the proxy,
//! built with the `thiserror` crate. Each variant maps to a distinct HTTP status
//! code so callers can tell a broken cache apart from a failing upstream API.
//!
//! ## Error Kinds
//! - **Cache**: the cache store could not be reached. Surfaced immediately, never retried.
//! - **Upstream**: the statistics API failed (network, non-2xx, authentication).
//! - **UpstreamTimeout**: the statistics API did not answer in time, even after the retry.
//! - **DataIntegrity**: upstream data referenced a team missing from the team table.
//! - **Configuration** / **Internal**: start-up and unexpected failures.
//!
//! Subsystem errors (`CacheError`, `UpstreamError`, `FormatError`) convert into
//! [`ProxyError`] through `From`, so the `?` operator can be used across layers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::caching::CacheError;
use crate::formatter::FormatError;
use crate::upstream::UpstreamError;

/// Main result type used throughout the proxy
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Error kinds produced while serving a resource
///
/// `Clone` is required because a single upstream outcome is shared with every
/// request waiting on the same in-flight fetch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProxyError {
    /// Cache store unreachable or rejected the command
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Upstream statistics API failed
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// Upstream statistics API did not answer in time
    #[error("Upstream timeout after {timeout_ms}ms")]
    UpstreamTimeout { timeout_ms: u64 },

    /// Upstream data could not be shaped into the public format
    #[error("Data integrity error: {message}")]
    DataIntegrity { message: String },

    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ProxyError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an upstream error with a custom message
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Cache { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::DataIntegrity { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a client may reasonably retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::UpstreamTimeout { .. })
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Cache { .. } => "cache_error",
            Self::Upstream { .. } => "upstream_error",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::DataIntegrity { .. } => "data_integrity_error",
            Self::Configuration { .. } => "configuration_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<CacheError> for ProxyError {
    fn from(err: CacheError) -> Self {
        Self::Cache {
            message: err.to_string(),
        }
    }
}

impl From<UpstreamError> for ProxyError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Timeout { timeout } => Self::UpstreamTimeout {
                timeout_ms: timeout.as_millis() as u64,
            },
            other => Self::Upstream {
                message: other.to_string(),
            },
        }
    }
}

impl From<FormatError> for ProxyError {
    fn from(err: FormatError) -> Self {
        Self::DataIntegrity {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

/// Render errors as `{ "error": { ... } }` with the status from [`ProxyError::status_code`]
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
                "retryable": self.is_retryable(),
            }
        });

        (status, Json(error_response)).into_response()
    }
}
