//! League table rows with team display data attached.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{strip_reserved, FormatError, TeamInfoLookup};
use crate::upstream::{StandingRecord, TeamRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub team: TeamRef,
    pub name: String,
    pub logo: String,

    #[serde(flatten)]
    pub stats: Map<String, Value>,
}

const FIELDS: [&str; 3] = ["team", "name", "logo"];

pub fn format(
    rows: Vec<StandingRecord>,
    teams: &TeamInfoLookup,
) -> Result<Vec<Standing>, FormatError> {
    rows.into_iter()
        .map(|mut row| {
            let info = teams.get(&row.team.id)?;
            strip_reserved(&mut row.stats, &FIELDS);
            Ok(Standing {
                name: info.name.clone(),
                logo: info.logo.clone(),
                team: row.team,
                stats: row.stats,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::TeamInfo;
    use serde_json::json;

    fn lulea() -> TeamInfoLookup {
        TeamInfoLookup::new().with_team("LHF", TeamInfo::new("Luleå HF", "lhf.png"))
    }

    #[test]
    fn test_attaches_name_and_logo() {
        let rows: Vec<StandingRecord> =
            serde_json::from_value(json!([{ "team": { "id": "LHF" }, "points": 10 }])).unwrap();

        let formatted = format(rows, &lulea()).unwrap();

        assert_eq!(
            serde_json::to_value(&formatted).unwrap(),
            json!([{ "team": { "id": "LHF" }, "points": 10, "name": "Luleå HF", "logo": "lhf.png" }])
        );
    }

    #[test]
    fn test_lookup_name_replaces_upstream_name() {
        let rows: Vec<StandingRecord> = serde_json::from_value(json!([
            { "team": { "id": "LHF" }, "name": "Lulea", "logo": "old.png", "points": 10 }
        ]))
        .unwrap();

        let formatted = format(rows, &lulea()).unwrap();
        let body = serde_json::to_string(&formatted).unwrap();

        assert_eq!(body.matches("\"name\"").count(), 1);
        assert_eq!(body.matches("\"logo\"").count(), 1);
        let decoded: Vec<Standing> = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded[0].name, "Luleå HF");
        assert_eq!(decoded[0].logo, "lhf.png");
        assert_eq!(decoded[0].stats["points"], 10);
    }

    #[test]
    fn test_unknown_team_fails_whole_table() {
        let rows: Vec<StandingRecord> = serde_json::from_value(json!([
            { "team": { "id": "LHF" }, "points": 10 },
            { "team": { "id": "XYZ" }, "points": 3 }
        ]))
        .unwrap();

        assert_eq!(
            format(rows, &lulea()),
            Err(FormatError::UnknownTeam {
                code: "XYZ".to_string()
            })
        );
    }
}
