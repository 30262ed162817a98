//! Raw record shapes returned by the statistics API.
//!
//! Only the fields the formatter reads are typed; everything else is kept in a
//! flattened map and passes through to the public response untouched.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Team reference embedded in standings and player rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    /// League team code, e.g. `LHF`
    pub id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TeamRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

/// One row of the league table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRecord {
    pub team: TeamRef,

    #[serde(flatten)]
    pub stats: Map<String, Value>,
}

/// One scheduled or played game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<u64>,

    pub home_team_code: String,
    pub away_team_code: String,

    #[serde(default)]
    pub home_team_result: u32,

    #[serde(default)]
    pub away_team_result: u32,

    pub start_date_time: DateTime<FixedOffset>,

    #[serde(default)]
    pub played: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Player identity block of a statistics row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub team: TeamRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Goalkeeper or skater statistics row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub info: PlayerInfo,

    #[serde(flatten)]
    pub stats: Map<String, Value>,
}
