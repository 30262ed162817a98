//! # Upstream Statistics API
//!
//! The [`StatsProvider`] trait is the seam between the request handler and the
//! external statistics API. [`ShlClient`] is the production implementation; tests
//! substitute their own providers.

pub mod client;
pub mod models;
pub mod retry;

pub use client::{ShlClient, ShlClientConfig};
pub use models::{GameRecord, PlayerInfo, StandingRecord, StatRecord, TeamRef};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use std::time::Duration;

/// Upstream operation result
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Failures talking to the statistics API
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("request timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
}

impl UpstreamError {
    /// Transient failures worth one more attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => !err.is_decode() && !err.is_builder(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout { .. } => true,
            Self::Authentication { .. } | Self::Url(_) => false,
        }
    }
}

/// Per-season fetch operations of the statistics API
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// League table
    async fn standings(&self, season: u16) -> UpstreamResult<Vec<StandingRecord>>;

    /// Full game schedule, played and upcoming
    async fn games(&self, season: u16) -> UpstreamResult<Vec<GameRecord>>;

    /// Goalkeeper statistics
    async fn goalkeepers(&self, season: u16) -> UpstreamResult<Vec<StatRecord>>;

    /// Skater statistics
    async fn players(&self, season: u16) -> UpstreamResult<Vec<StatRecord>>;
}
