//! Team display data keyed by league team code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::FormatError;

/// Display name and logo of a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
    pub logo: String,
}

impl TeamInfo {
    pub fn new(name: impl Into<String>, logo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logo: logo.into(),
        }
    }
}

/// Immutable map from team code to [`TeamInfo`]
#[derive(Debug, Clone, Default)]
pub struct TeamInfoLookup {
    teams: HashMap<String, TeamInfo>,
}

const SHL_TEAMS: &[(&str, &str)] = &[
    ("BIF", "Brynäs IF"),
    ("DIF", "Djurgårdens IF"),
    ("FBK", "Färjestad BK"),
    ("FHC", "Frölunda HC"),
    ("HV71", "HV71"),
    ("IKO", "IK Oskarshamn"),
    ("LIF", "Leksands IF"),
    ("LHC", "Linköping HC"),
    ("LHF", "Luleå HF"),
    ("MIF", "Malmö Redhawks"),
    ("RBK", "Rögle BK"),
    ("SAIK", "Skellefteå AIK"),
    ("VLH", "Växjö Lakers"),
    ("OHK", "Örebro HK"),
];

impl TeamInfoLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_team(mut self, code: impl Into<String>, info: TeamInfo) -> Self {
        self.teams.insert(code.into(), info);
        self
    }

    /// The built-in league table
    pub fn shl() -> Self {
        SHL_TEAMS
            .iter()
            .map(|(code, name)| {
                let logo = format!("{}.png", code.to_lowercase());
                (code.to_string(), TeamInfo::new(*name, logo))
            })
            .collect()
    }

    pub fn get(&self, code: &str) -> Result<&TeamInfo, FormatError> {
        self.teams.get(code).ok_or_else(|| FormatError::UnknownTeam {
            code: code.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

impl FromIterator<(String, TeamInfo)> for TeamInfoLookup {
    fn from_iter<I: IntoIterator<Item = (String, TeamInfo)>>(iter: I) -> Self {
        Self {
            teams: iter.into_iter().collect(),
        }
    }
}
