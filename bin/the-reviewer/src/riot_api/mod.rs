use crate::error::ReviewError;
use async_trait::async_trait;
use riven::consts::{PlatformRoute, RegionalRoute};
use std::fmt::Display;
use std::str::FromStr;
use the_reviewer_analysis::MatchRecord;

pub mod match_data;

pub use match_data::RiotMatchFetcher;

/// Where match data comes from.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Fetch and validate a single match.
    async fn fetch_match(&self, match_id: &str) -> Result<MatchRecord, ReviewError>;

    /// Most recent match ids of a player, newest first.
    async fn recent_match_ids(&self, riot_id: &str, count: u32)
        -> Result<Vec<String>, ReviewError>;
}

/// A player identifier in the `name#tag` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiotId {
    pub game_name: String,
    pub tag_line: String,
}

impl FromStr for RiotId {
    type Err = ReviewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ReviewError::ValidationError(format!("`{value}` is not a NAME#TAG riot id"));
        // Game names may contain '#', tag lines never do
        let (game_name, tag_line) = value.rsplit_once('#').ok_or_else(invalid)?;
        let (game_name, tag_line) = (game_name.trim(), tag_line.trim());
        if game_name.is_empty() || tag_line.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            game_name: game_name.to_string(),
            tag_line: tag_line.to_string(),
        })
    }
}

impl Display for RiotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.game_name, self.tag_line)
    }
}

const PLATFORM_ALIASES: [(&str, &str); 9] = [
    ("NA", "NA1"),
    ("EUW", "EUW1"),
    ("EUNE", "EUN1"),
    ("BR", "BR1"),
    ("JP", "JP1"),
    ("OCE", "OC1"),
    ("TR", "TR1"),
    ("LAN", "LA1"),
    ("LAS", "LA2"),
];

/// Resolve a configured region into the regional route match-v5 and account-v1
/// are served from. Accepts platforms (`KR`, `EUW1`, `euw`) and regions (`ASIA`).
pub fn regional_route(region: &str) -> Result<RegionalRoute, ReviewError> {
    let region = region.trim().to_uppercase();
    let platform = PLATFORM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == region)
        .map(|(_, platform)| *platform)
        .unwrap_or(region.as_str());

    if let Ok(platform) = PlatformRoute::from_str(platform) {
        return Ok(platform.to_regional());
    }
    RegionalRoute::from_str(&region)
        .map_err(|_| ReviewError::ValidationError(format!("unknown game region `{region}`")))
}
