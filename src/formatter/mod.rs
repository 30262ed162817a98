//! # Response Formatter
//!
//! Pure transformations from raw upstream records to the public response shapes.
//! Every function either formats the whole resource or fails; partial output is
//! never produced, so nothing half-formatted can reach the cache.

pub mod games;
pub mod standings;
pub mod stats;
pub mod teams;
pub mod winstreaks;

pub use games::Game;
pub use standings::Standing;
pub use stats::{GoalieStats, PlayerStats};
pub use teams::{TeamInfo, TeamInfoLookup};
pub use winstreaks::{GameOutcome, TeamWinStreak};

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::upstream::{GameRecord, StandingRecord, StatRecord};

/// Remove upstream fields that would duplicate a key the formatter sets itself
fn strip_reserved(fields: &mut Map<String, Value>, reserved: &[&str]) {
    for key in reserved {
        fields.remove(*key);
    }
}

/// Formatting failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unknown team code: {code}")]
    UnknownTeam { code: String },
}

/// Formats each resource against a shared team table
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    teams: Arc<TeamInfoLookup>,
}

impl ResponseFormatter {
    pub fn new(teams: Arc<TeamInfoLookup>) -> Self {
        Self { teams }
    }

    pub fn standings(&self, rows: Vec<StandingRecord>) -> Result<Vec<Standing>, FormatError> {
        standings::format(rows, &self.teams)
    }

    pub fn games(&self, games: Vec<GameRecord>) -> Result<Vec<Game>, FormatError> {
        games::format(games, &self.teams)
    }

    pub fn goalies(&self, rows: Vec<StatRecord>) -> Vec<GoalieStats> {
        stats::format_goalies(rows)
    }

    pub fn players(&self, rows: Vec<StatRecord>) -> Vec<PlayerStats> {
        stats::format_players(rows)
    }

    pub fn winstreaks(&self, games: &[GameRecord]) -> Result<Vec<TeamWinStreak>, FormatError> {
        winstreaks::format(games, &self.teams)
    }
}
