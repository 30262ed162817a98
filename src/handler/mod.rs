//! # Request Handler
//!
//! Cache-aside orchestration for every resource endpoint:
//!
//! 1. Build the resource key and read it from the cache store. A store error fails
//!    the request; a hit is decoded and returned with `source: "cache"`.
//! 2. On a miss, join the in-flight registry for the key. The leader fetches from the
//!    statistics API (timeout plus one retry), formats, writes the cache with the TTL
//!    and publishes the serialized payload; followers decode that same payload.
//! 3. The cache write is best-effort: a failed write is logged and the fresh data is
//!    still returned with `source: "api"`.
//!
//! An entry that no longer decodes into the resource type is logged and treated as
//! a miss.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

use crate::caching::{CacheStore, DeduplicationManager, Flight, ResourceKeyGenerator, ResourceKind};
use crate::core::config::ProxyConfig;
use crate::core::error::{ProxyError, ProxyResult};
use crate::core::types::Envelope;
use crate::formatter::{Game, GoalieStats, PlayerStats, ResponseFormatter, Standing, TeamInfoLookup, TeamWinStreak};
use crate::observability::metrics;
use crate::upstream::{RetryPolicy, StatsProvider, UpstreamResult};

/// Per-handler parameters
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Season requested from the statistics API
    pub season: u16,

    /// Lifetime of every cache entry written
    pub ttl: Duration,

    pub keys: ResourceKeyGenerator,
    pub retry: RetryPolicy,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            season: 2019,
            ttl: Duration::from_secs(300),
            keys: ResourceKeyGenerator::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&ProxyConfig> for HandlerSettings {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            season: config.season,
            ttl: config.cache.ttl,
            keys: ResourceKeyGenerator::new(config.cache.key_strategy())
                .with_prefix(config.cache.key_prefix.clone()),
            retry: RetryPolicy::new(config.upstream.timeout, config.upstream.retry_backoff),
        }
    }
}

/// Serves each resource through the cache
pub struct RequestHandler {
    cache: Arc<dyn CacheStore>,
    upstream: Arc<dyn StatsProvider>,
    formatter: ResponseFormatter,
    settings: HandlerSettings,
    in_flight: Arc<DeduplicationManager>,
}

impl RequestHandler {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        upstream: Arc<dyn StatsProvider>,
        teams: Arc<TeamInfoLookup>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            cache,
            upstream,
            formatter: ResponseFormatter::new(teams),
            settings,
            in_flight: Arc::new(DeduplicationManager::new()),
        }
    }

    /// Cache key used for `kind` under the current settings
    pub fn key_for(&self, kind: ResourceKind) -> String {
        self.settings.keys.key_for(kind, self.settings.season)
    }

    #[instrument(skip(self))]
    pub async fn standings(&self) -> ProxyResult<Envelope<Vec<Standing>>> {
        let kind = ResourceKind::Standings;
        self.serve(kind, move || async move {
            let season = self.settings.season;
            let rows = self.fetch(kind, || self.upstream.standings(season)).await?;
            Ok(self.formatter.standings(rows)?)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn games(&self) -> ProxyResult<Envelope<Vec<Game>>> {
        let kind = ResourceKind::Games;
        self.serve(kind, move || async move {
            let season = self.settings.season;
            let games = self.fetch(kind, || self.upstream.games(season)).await?;
            Ok(self.formatter.games(games)?)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn goalies(&self) -> ProxyResult<Envelope<Vec<GoalieStats>>> {
        let kind = ResourceKind::Goalies;
        self.serve(kind, move || async move {
            let season = self.settings.season;
            let rows = self.fetch(kind, || self.upstream.goalkeepers(season)).await?;
            Ok(self.formatter.goalies(rows))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn players(&self) -> ProxyResult<Envelope<Vec<PlayerStats>>> {
        let kind = ResourceKind::Players;
        self.serve(kind, move || async move {
            let season = self.settings.season;
            let rows = self.fetch(kind, || self.upstream.players(season)).await?;
            Ok(self.formatter.players(rows))
        })
        .await
    }

    /// Win streaks are derived from the game schedule
    #[instrument(skip(self))]
    pub async fn winstreaks(&self) -> ProxyResult<Envelope<Vec<TeamWinStreak>>> {
        let kind = ResourceKind::Winstreaks;
        self.serve(kind, move || async move {
            let season = self.settings.season;
            let games = self.fetch(kind, || self.upstream.games(season)).await?;
            Ok(self.formatter.winstreaks(&games)?)
        })
        .await
    }

    async fn serve<T, F, Fut>(&self, kind: ResourceKind, produce: F) -> ProxyResult<Envelope<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProxyResult<T>>,
    {
        let key = self.key_for(kind);

        if let Some((data, _)) = self.lookup::<T>(&key).await? {
            debug!(key = %key, "Cache hit");
            metrics::record_cache_lookup(kind, true);
            return Ok(Envelope::cache(data));
        }

        debug!(key = %key, "Cache miss");
        metrics::record_cache_lookup(kind, false);

        match self.in_flight.join(&key) {
            Flight::Leader(leader) => {
                // A flight that finished between our lookup and join has already
                // written the entry
                let outcome = match self.lookup::<T>(&key).await {
                    Ok(Some((data, raw))) => {
                        debug!(key = %key, "Entry written by an earlier refresh");
                        leader.complete(Ok(Arc::from(raw)));
                        return Ok(Envelope::cache(data));
                    }
                    Ok(None) => self.refresh(&key, produce).await,
                    Err(err) => Err(err),
                };

                match outcome {
                    Ok((data, payload)) => {
                        leader.complete(Ok(payload));
                        Ok(Envelope::api(data))
                    }
                    Err(err) => {
                        leader.complete(Err(err.clone()));
                        Err(err)
                    }
                }
            }
            Flight::Follower(follower) => match follower.wait().await {
                Some(Ok(payload)) => Ok(Envelope::api(serde_json::from_str(&payload)?)),
                Some(Err(err)) => Err(err),
                None => {
                    debug!(key = %key, "In-flight refresh abandoned, fetching directly");
                    let (data, _) = self.refresh(&key, produce).await?;
                    Ok(Envelope::api(data))
                }
            },
        }
    }

    /// Read and decode `key`; an entry that does not decode counts as absent
    async fn lookup<T>(&self, key: &str) -> ProxyResult<Option<(T, String)>>
    where
        T: DeserializeOwned,
    {
        let cached = self.cache.get(key).await.map_err(|err| {
            error!(key, error = %err, "Cache lookup failed");
            ProxyError::from(err)
        })?;

        let Some(raw) = cached else {
            return Ok(None);
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(data) => Ok(Some((data, raw))),
            Err(err) => {
                warn!(key, error = %err, "Cached value does not decode, refreshing from upstream");
                Ok(None)
            }
        }
    }

    /// Produce fresh data and write it to the cache
    async fn refresh<T, F, Fut>(&self, key: &str, produce: F) -> ProxyResult<(T, Arc<str>)>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProxyResult<T>>,
    {
        let data = produce().await?;
        let payload: Arc<str> = Arc::from(serde_json::to_string(&data)?);

        if let Err(err) = self.cache.set_with_ttl(key, &payload, self.settings.ttl).await {
            warn!(key, error = %err, "Failed to write cache entry, serving uncached");
        }

        Ok((data, payload))
    }

    /// One upstream fetch under the retry policy
    async fn fetch<R, F, Fut>(&self, kind: ResourceKind, call: F) -> ProxyResult<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = UpstreamResult<R>>,
    {
        let started = Instant::now();
        let result = self.settings.retry.run(kind.as_str(), call).await;
        metrics::record_upstream(kind, started.elapsed(), result.is_ok());

        result.map_err(|err| {
            error!(resource = %kind, error = %err, "Upstream fetch failed");
            ProxyError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::KeyGenerationStrategy;

    #[test]
    fn test_settings_from_config() {
        let mut config = ProxyConfig::default();
        config.season = 2020;
        config.cache.ttl = Duration::from_secs(60);
        config.cache.include_season = true;
        config.upstream.timeout = Duration::from_secs(2);

        let settings = HandlerSettings::from(&config);

        assert_eq!(settings.season, 2020);
        assert_eq!(settings.ttl, Duration::from_secs(60));
        assert_eq!(settings.keys.strategy(), KeyGenerationStrategy::Seasoned);
        assert_eq!(settings.retry.timeout, Duration::from_secs(2));
        assert_eq!(settings.retry.max_retries, 1);
    }

    #[test]
    fn test_default_settings_use_public_keys() {
        let settings = HandlerSettings::default();
        assert_eq!(
            settings.keys.key_for(ResourceKind::Players, settings.season),
            "shl:players"
        );
    }
}
