//! # SHL Open API Client
//!
//! Authenticates with OAuth2 client credentials and fetches season statistics.
//! The access token is cached and refreshed shortly before it expires; a `401`
//! from a data endpoint drops the cached token so the next call authenticates again.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use url::Url;

use super::models::{GameRecord, StandingRecord, StatRecord};
use super::{StatsProvider, UpstreamError, UpstreamResult};
use crate::core::config::UpstreamSettings;

/// Refresh the token this long before the upstream says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Client configuration
#[derive(Debug, Clone)]
pub struct ShlClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,

    /// Connect timeout for the underlying HTTP client
    pub connect_timeout: Duration,
}

impl From<&UpstreamSettings> for ShlClientConfig {
    fn from(settings: &UpstreamSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,

    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// Statistics API client
pub struct ShlClient {
    http: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<AccessToken>>,
}

impl ShlClient {
    pub fn new(config: ShlClientConfig) -> UpstreamResult<Self> {
        // A trailing slash keeps `Url::join` from replacing the last path segment
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("shl-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
            token: RwLock::new(None),
        })
    }

    /// Current access token, authenticating if needed
    async fn access_token(&self) -> UpstreamResult<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = slot.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let token = self.authenticate().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    async fn authenticate(&self) -> UpstreamResult<AccessToken> {
        let url = self.base_url.join("oauth2/token")?;
        let response = self
            .http
            .post(url.clone())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            return Err(UpstreamError::Authentication {
                reason: format!("token endpoint returned {}", status),
            });
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in);
        info!("Authenticated with statistics API, token valid for {:?}", lifetime);

        Ok(AccessToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> UpstreamResult<T> {
        let token = self.access_token().await?;
        let url = self.base_url.join(path)?;

        debug!("GET {}", url);
        let response = self.http.get(url.clone()).bearer_auth(token).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            *self.token.write().await = None;
            return Err(UpstreamError::Authentication {
                reason: format!("{} rejected the access token ({})", url, status),
            });
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl StatsProvider for ShlClient {
    #[instrument(skip(self))]
    async fn standings(&self, season: u16) -> UpstreamResult<Vec<StandingRecord>> {
        self.get_json(&format!("seasons/{}/statistics/teams/standings", season))
            .await
    }

    #[instrument(skip(self))]
    async fn games(&self, season: u16) -> UpstreamResult<Vec<GameRecord>> {
        self.get_json(&format!("seasons/{}/games", season)).await
    }

    #[instrument(skip(self))]
    async fn goalkeepers(&self, season: u16) -> UpstreamResult<Vec<StatRecord>> {
        self.get_json(&format!("seasons/{}/statistics/goalkeepers", season))
            .await
    }

    #[instrument(skip(self))]
    async fn players(&self, season: u16) -> UpstreamResult<Vec<StatRecord>> {
        self.get_json(&format!("seasons/{}/statistics/players", season))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ShlClientConfig {
        ShlClientConfig {
            base_url: base_url.to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ShlClient::new(config("https://openapi.shl.se/v1")).unwrap();
        assert_eq!(
            client.base_url.join("seasons/2019/games").unwrap().as_str(),
            "https://openapi.shl.se/v1/seasons/2019/games"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ShlClient::new(config("not a url")),
            Err(UpstreamError::Url(_))
        ));
    }

    #[test]
    fn test_token_freshness() {
        let stale = AccessToken {
            value: "t".into(),
            refresh_at: Instant::now(),
        };
        assert!(!stale.is_fresh());

        let fresh = AccessToken {
            value: "t".into(),
            refresh_at: Instant::now() + Duration::from_secs(60),
        };
        assert!(fresh.is_fresh());
    }
}
