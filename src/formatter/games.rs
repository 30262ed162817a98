//! Game schedule with team display data for both sides.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{strip_reserved, FormatError, TeamInfoLookup};
use crate::upstream::GameRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<u64>,

    pub home_team_code: String,
    pub home_team_name: String,
    pub home_team_logo: String,
    pub home_team_result: u32,

    pub away_team_code: String,
    pub away_team_name: String,
    pub away_team_logo: String,
    pub away_team_result: u32,

    pub start_date_time: DateTime<FixedOffset>,
    pub played: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const FIELDS: [&str; 11] = [
    "game_id",
    "home_team_code",
    "home_team_name",
    "home_team_logo",
    "home_team_result",
    "away_team_code",
    "away_team_name",
    "away_team_logo",
    "away_team_result",
    "start_date_time",
    "played",
];

pub fn format(games: Vec<GameRecord>, teams: &TeamInfoLookup) -> Result<Vec<Game>, FormatError> {
    games
        .into_iter()
        .map(|mut game| {
            let home = teams.get(&game.home_team_code)?.clone();
            let away = teams.get(&game.away_team_code)?.clone();
            strip_reserved(&mut game.extra, &FIELDS);
            Ok(Game {
                game_id: game.game_id,
                home_team_code: game.home_team_code,
                home_team_name: home.name,
                home_team_logo: home.logo,
                home_team_result: game.home_team_result,
                away_team_code: game.away_team_code,
                away_team_name: away.name,
                away_team_logo: away.logo,
                away_team_result: game.away_team_result,
                start_date_time: game.start_date_time,
                played: game.played,
                extra: game.extra,
            })
        })
        .collect()
}
