//! Shared fixtures for the integration tests: a scriptable statistics provider and
//! a cache store whose reads or writes can be made to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shl_proxy::caching::{CacheError, CacheResult, CacheStore, InMemoryCache, InMemoryCacheConfig};
use shl_proxy::formatter::TeamInfoLookup;
use shl_proxy::handler::{HandlerSettings, RequestHandler};
use shl_proxy::upstream::{
    GameRecord, RetryPolicy, StandingRecord, StatRecord, StatsProvider, UpstreamError,
    UpstreamResult,
};

/// How the mock answers the next calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    FailWith(u16),
    Hang,
}

#[derive(Debug, Clone)]
pub struct Fixtures {
    pub standings: Vec<StandingRecord>,
    pub games: Vec<GameRecord>,
    pub goalies: Vec<StatRecord>,
    pub players: Vec<StatRecord>,
}

impl Default for Fixtures {
    fn default() -> Self {
        Self {
            standings: serde_json::from_value(json!([
                { "team": { "id": "LHF" }, "points": 10 }
            ]))
            .unwrap(),
            games: serde_json::from_value(json!([
                {
                    "game_id": 1,
                    "home_team_code": "LHF",
                    "away_team_code": "FBK",
                    "home_team_result": 3,
                    "away_team_result": 2,
                    "start_date_time": "2019-09-14T15:15:00+02:00",
                    "played": true
                },
                {
                    "game_id": 2,
                    "home_team_code": "FBK",
                    "away_team_code": "LHF",
                    "home_team_result": 1,
                    "away_team_result": 4,
                    "start_date_time": "2019-09-17T19:00:00+02:00",
                    "played": true
                },
                {
                    "game_id": 3,
                    "home_team_code": "LHF",
                    "away_team_code": "FBK",
                    "start_date_time": "2019-09-21T15:15:00+02:00",
                    "played": false
                }
            ]))
            .unwrap(),
            goalies: serde_json::from_value(json!([
                {
                    "info": {
                        "player_id": 11,
                        "first_name": "Joel",
                        "last_name": "Lassinantti",
                        "team": { "id": "LHF" },
                        "position": "GK"
                    },
                    "svs": 812,
                    "svs_perc": 92.7
                }
            ]))
            .unwrap(),
            players: serde_json::from_value(json!([
                {
                    "info": {
                        "player_id": 12,
                        "first_name": "Linus",
                        "last_name": "Omark",
                        "team": { "id": "LHF" },
                        "position": "LW"
                    },
                    "g": 14,
                    "a": 31
                }
            ]))
            .unwrap(),
        }
    }
}

/// In-process [`StatsProvider`] counting every call
pub struct MockProvider {
    fixtures: Mutex<Fixtures>,
    behavior: Mutex<Behavior>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            fixtures: Mutex::new(Fixtures::default()),
            behavior: Mutex::new(Behavior::Succeed),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn set_standings(&self, standings: serde_json::Value) {
        self.fixtures.lock().unwrap().standings = serde_json::from_value(standings).unwrap();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond<T>(&self, value: T) -> UpstreamResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            Behavior::Succeed => Ok(value),
            Behavior::FailWith(status) => Err(UpstreamError::Status {
                status,
                url: "http://mock/".to_string(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(value)
            }
        }
    }
}

#[async_trait]
impl StatsProvider for MockProvider {
    async fn standings(&self, _season: u16) -> UpstreamResult<Vec<StandingRecord>> {
        let rows = self.fixtures.lock().unwrap().standings.clone();
        self.respond(rows).await
    }

    async fn games(&self, _season: u16) -> UpstreamResult<Vec<GameRecord>> {
        let games = self.fixtures.lock().unwrap().games.clone();
        self.respond(games).await
    }

    async fn goalkeepers(&self, _season: u16) -> UpstreamResult<Vec<StatRecord>> {
        let rows = self.fixtures.lock().unwrap().goalies.clone();
        self.respond(rows).await
    }

    async fn players(&self, _season: u16) -> UpstreamResult<Vec<StatRecord>> {
        let rows = self.fixtures.lock().unwrap().players.clone();
        self.respond(rows).await
    }
}

/// In-memory store with switchable read and write failures
pub struct FlakyCache {
    inner: InMemoryCache,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self {
            inner: InMemoryCache::new(InMemoryCacheConfig::default()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable);
        }
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Store {
                message: "write refused".to_string(),
            });
        }
        self.inner.set_with_ttl(key, value, ttl).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(!self.fail_reads.load(Ordering::SeqCst))
    }
}

/// Short timeouts so retry paths finish quickly
pub fn fast_settings() -> HandlerSettings {
    HandlerSettings {
        retry: RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(1)),
        ..HandlerSettings::default()
    }
}

pub fn build_handler(
    cache: Arc<dyn CacheStore>,
    provider: Arc<MockProvider>,
    settings: HandlerSettings,
) -> RequestHandler {
    RequestHandler::new(cache, provider, Arc::new(TeamInfoLookup::shl()), settings)
}
