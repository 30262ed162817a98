//! Per-team win streaks derived from the game schedule.
//!
//! Only played games count. Each team's games are ordered by start time (game id
//! breaks ties); a win extends the running streak, a loss or a tie resets it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FormatError, TeamInfoLookup};
use crate::upstream::GameRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Win,
    Loss,
    Tie,
}

impl GameOutcome {
    fn from_score(scored: u32, conceded: u32) -> Self {
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => Self::Win,
            std::cmp::Ordering::Less => Self::Loss,
            std::cmp::Ordering::Equal => Self::Tie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamWinStreak {
    pub team_code: String,
    pub name: String,
    pub logo: String,

    /// Running streak after each played game
    pub streak: Vec<u32>,
    pub current: u32,
    pub longest: u32,
}

/// Running streak value after each outcome
pub fn streak_sequence(outcomes: &[GameOutcome]) -> Vec<u32> {
    outcomes
        .iter()
        .scan(0u32, |running, outcome| {
            *running = match outcome {
                GameOutcome::Win => *running + 1,
                GameOutcome::Loss | GameOutcome::Tie => 0,
            };
            Some(*running)
        })
        .collect()
}

pub fn format(games: &[GameRecord], teams: &TeamInfoLookup) -> Result<Vec<TeamWinStreak>, FormatError> {
    let mut played: Vec<&GameRecord> = games.iter().filter(|game| game.played).collect();
    played.sort_by(|a, b| {
        a.start_date_time
            .cmp(&b.start_date_time)
            .then(a.game_id.cmp(&b.game_id))
    });

    // Teams with only upcoming games still get an (empty) entry
    let mut outcomes: BTreeMap<&str, Vec<GameOutcome>> = BTreeMap::new();
    for game in games {
        outcomes.entry(game.home_team_code.as_str()).or_default();
        outcomes.entry(game.away_team_code.as_str()).or_default();
    }

    for game in played {
        if let Some(home) = outcomes.get_mut(game.home_team_code.as_str()) {
            home.push(GameOutcome::from_score(game.home_team_result, game.away_team_result));
        }
        if let Some(away) = outcomes.get_mut(game.away_team_code.as_str()) {
            away.push(GameOutcome::from_score(game.away_team_result, game.home_team_result));
        }
    }

    outcomes
        .into_iter()
        .map(|(code, outcomes)| {
            let info = teams.get(code)?;
            let streak = streak_sequence(&outcomes);
            Ok(TeamWinStreak {
                team_code: code.to_string(),
                name: info.name.clone(),
                logo: info.logo.clone(),
                current: streak.last().copied().unwrap_or(0),
                longest: streak.iter().copied().max().unwrap_or(0),
                streak,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use super::GameOutcome::*;

    fn game(id: u64, home: &str, away: &str, score: (u32, u32), start: &str, played: bool) -> GameRecord {
        serde_json::from_value(json!({
            "game_id": id,
            "home_team_code": home,
            "away_team_code": away,
            "home_team_result": score.0,
            "away_team_result": score.1,
            "start_date_time": start,
            "played": played
        }))
        .unwrap()
    }

    #[test]
    fn test_streak_sequence() {
        let streak = streak_sequence(&[Win, Win, Loss, Win, Win, Win, Tie]);
        assert_eq!(streak, vec![1, 2, 0, 1, 2, 3, 0]);
        assert_eq!(streak.iter().max(), Some(&3));
    }

    #[test]
    fn test_streak_sequence_empty() {
        assert!(streak_sequence(&[]).is_empty());
    }

    #[test]
    fn test_orders_by_start_time_and_skips_unplayed() {
        let games = vec![
            game(3, "LHF", "FBK", (1, 4), "2019-09-21T15:15:00+02:00", true),
            game(1, "LHF", "FBK", (3, 2), "2019-09-14T15:15:00+02:00", true),
            game(2, "FBK", "LHF", (0, 2), "2019-09-17T19:00:00+02:00", true),
            game(4, "FBK", "LHF", (0, 0), "2019-09-28T15:15:00+02:00", false),
        ];

        let streaks = format(&games, &TeamInfoLookup::shl()).unwrap();
        assert_eq!(streaks.len(), 2);

        // Sorted by team code
        let fbk = &streaks[0];
        let lhf = &streaks[1];
        assert_eq!(fbk.team_code, "FBK");
        assert_eq!(lhf.team_code, "LHF");

        assert_eq!(lhf.streak, vec![1, 2, 0]);
        assert_eq!(lhf.current, 0);
        assert_eq!(lhf.longest, 2);
        assert_eq!(lhf.name, "Luleå HF");

        assert_eq!(fbk.streak, vec![0, 0, 1]);
        assert_eq!(fbk.current, 1);
    }

    #[test]
    fn test_tie_resets() {
        let games = vec![
            game(1, "LHF", "FBK", (2, 0), "2019-09-14T15:15:00+02:00", true),
            game(2, "LHF", "FBK", (1, 1), "2019-09-15T15:15:00+02:00", true),
        ];

        let streaks = format(&games, &TeamInfoLookup::shl()).unwrap();
        assert_eq!(streaks[1].streak, vec![1, 0]);
        assert_eq!(streaks[0].streak, vec![0, 0]);
    }

    #[test]
    fn test_game_id_breaks_ties() {
        let games = vec![
            game(2, "LHF", "FBK", (0, 1), "2019-09-14T15:15:00+02:00", true),
            game(1, "LHF", "FBK", (1, 0), "2019-09-14T15:15:00+02:00", true),
        ];

        let streaks = format(&games, &TeamInfoLookup::shl()).unwrap();
        assert_eq!(streaks[1].streak, vec![1, 0]);
    }

    #[test]
    fn test_unknown_team() {
        let games = vec![game(1, "LHF", "XYZ", (2, 0), "2019-09-14T15:15:00+02:00", true)];

        assert!(matches!(
            format(&games, &TeamInfoLookup::shl()),
            Err(FormatError::UnknownTeam { code }) if code == "XYZ"
        ));
    }
}
