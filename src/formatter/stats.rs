//! Goalkeeper and skater statistics with the identity block lifted to the top level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::strip_reserved;
use crate::upstream::{PlayerInfo, StatRecord};

const GOALIE_FIELDS: [&str; 5] = ["player_id", "first_name", "last_name", "team_code", "number"];
const PLAYER_FIELDS: [&str; 6] = [
    "player_id",
    "first_name",
    "last_name",
    "team_code",
    "number",
    "position",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalieStats {
    pub player_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub team_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    #[serde(flatten)]
    pub stats: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub team_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    #[serde(flatten)]
    pub stats: Map<String, Value>,
}

/// Unknown identity fields join the statistics unless a statistic already uses the name.
/// Names of the lifted identity fields are dropped from the result.
fn merge_extra(
    mut stats: Map<String, Value>,
    extra: Map<String, Value>,
    reserved: &[&str],
) -> Map<String, Value> {
    for (key, value) in extra {
        stats.entry(key).or_insert(value);
    }
    strip_reserved(&mut stats, reserved);
    stats
}

pub fn format_goalies(rows: Vec<StatRecord>) -> Vec<GoalieStats> {
    rows.into_iter()
        .map(|row| {
            let PlayerInfo {
                player_id,
                first_name,
                last_name,
                team,
                number,
                position: _,
                extra,
            } = row.info;

            GoalieStats {
                player_id,
                first_name,
                last_name,
                team_code: team.id,
                number,
                stats: merge_extra(row.stats, extra, &GOALIE_FIELDS),
            }
        })
        .collect()
}

pub fn format_players(rows: Vec<StatRecord>) -> Vec<PlayerStats> {
    rows.into_iter()
        .map(|row| {
            let PlayerInfo {
                player_id,
                first_name,
                last_name,
                team,
                number,
                position,
                extra,
            } = row.info;

            PlayerStats {
                player_id,
                first_name,
                last_name,
                team_code: team.id,
                number,
                position,
                stats: merge_extra(row.stats, extra, &PLAYER_FIELDS),
            }
        })
        .collect()
}
