//! # Resource Key Generator
//!
//! Every cacheable resource has exactly one key per season. With the default
//! [`KeyGenerationStrategy::Simple`] strategy the season is left out of the key
//! (`shl:standings`), so changing the season without flushing the cache serves the
//! previous season's data until the entries expire. [`KeyGenerationStrategy::Seasoned`]
//! puts the season into the key (`shl:2019:standings`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The resources served by the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Standings,
    Games,
    Goalies,
    Players,
    Winstreaks,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Standings,
        ResourceKind::Games,
        ResourceKind::Goalies,
        ResourceKind::Players,
        ResourceKind::Winstreaks,
    ];

    /// Resource name, used in keys, routes and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standings => "standings",
            Self::Games => "games",
            Self::Goalies => "goalies",
            Self::Players => "players",
            Self::Winstreaks => "winstreaks",
        }
    }

    /// HTTP route serving this resource
    pub fn path(&self) -> &'static str {
        match self {
            Self::Standings => "/standings",
            Self::Games => "/games",
            Self::Goalies => "/goalies",
            Self::Players => "/players",
            Self::Winstreaks => "/winstreaks",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key generation strategy configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyGenerationStrategy {
    /// `<prefix>:<resource>`
    #[default]
    Simple,

    /// `<prefix>:<season>:<resource>`
    Seasoned,
}

/// Builds resource keys from a prefix and a strategy
#[derive(Debug, Clone)]
pub struct ResourceKeyGenerator {
    strategy: KeyGenerationStrategy,
    prefix: String,
}

impl ResourceKeyGenerator {
    /// Create a generator with the default `shl` prefix
    pub fn new(strategy: KeyGenerationStrategy) -> Self {
        Self {
            strategy,
            prefix: "shl".to_string(),
        }
    }

    /// Create with custom prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn strategy(&self) -> KeyGenerationStrategy {
        self.strategy
    }

    /// Key for `resource` in `season`
    pub fn key_for(&self, resource: ResourceKind, season: u16) -> String {
        match self.strategy {
            KeyGenerationStrategy::Simple => format!("{}:{}", self.prefix, resource),
            KeyGenerationStrategy::Seasoned => {
                format!("{}:{}:{}", self.prefix, season, resource)
            }
        }
    }
}

impl Default for ResourceKeyGenerator {
    fn default() -> Self {
        Self::new(KeyGenerationStrategy::Simple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_simple_keys_match_public_table() {
        let keys = ResourceKeyGenerator::default();
        assert_eq!(keys.key_for(ResourceKind::Standings, 2019), "shl:standings");
        assert_eq!(keys.key_for(ResourceKind::Games, 2019), "shl:games");
        assert_eq!(keys.key_for(ResourceKind::Goalies, 2019), "shl:goalies");
        assert_eq!(keys.key_for(ResourceKind::Players, 2019), "shl:players");
        assert_eq!(keys.key_for(ResourceKind::Winstreaks, 2019), "shl:winstreaks");
    }

    #[test]
    fn test_simple_keys_alias_across_seasons() {
        let keys = ResourceKeyGenerator::default();
        assert_eq!(
            keys.key_for(ResourceKind::Games, 2019),
            keys.key_for(ResourceKind::Games, 2020)
        );
    }

    #[test]
    fn test_seasoned_keys() {
        let keys = ResourceKeyGenerator::new(KeyGenerationStrategy::Seasoned).with_prefix("stats");
        assert_eq!(keys.key_for(ResourceKind::Players, 2020), "stats:2020:players");
        assert_ne!(
            keys.key_for(ResourceKind::Players, 2019),
            keys.key_for(ResourceKind::Players, 2020)
        );
    }

    #[test]
    fn test_keys_unique_per_resource() {
        let keys = ResourceKeyGenerator::default();
        let unique: HashSet<String> = ResourceKind::ALL
            .iter()
            .map(|kind| keys.key_for(*kind, 2019))
            .collect();
        assert_eq!(unique.len(), ResourceKind::ALL.len());
    }
}
