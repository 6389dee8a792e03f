use crate::error::ModelError;
use crate::role::Role;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Game modes that are always played five versus five.
const STANDARD_MODES: [&str; 2] = ["CLASSIC", "ARAM"];
const TEAM_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum TeamSide {
    Blue,
    Red,
}

impl TeamSide {
    pub const ALL: [TeamSide; 2] = [TeamSide::Blue, TeamSide::Red];

    /// Team ID as used by the Riot API.
    pub fn id(self) -> u16 {
        match self {
            TeamSide::Blue => 100,
            TeamSide::Red => 200,
        }
    }
}

impl TryFrom<u16> for TeamSide {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            100 => Ok(TeamSide::Blue),
            200 => Ok(TeamSide::Red),
            other => Err(format!("unknown team id {other}")),
        }
    }
}

impl From<TeamSide> for u16 {
    fn from(value: TeamSide) -> Self {
        value.id()
    }
}

impl Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSide::Blue => f.write_str("Blue"),
            TeamSide::Red => f.write_str("Red"),
        }
    }
}

/// A validated match, as fetched from the stats provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub game_mode: String,
    pub game_version: String,
    pub queue_id: u32,
    pub participants: Vec<ParticipantRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub puuid: String,
    pub name: String,
    pub champion: String,
    pub role: Role,
    pub team: TeamSide,
    pub stats: ParticipantStats,
    pub items: Vec<u32>,
}

/// Raw per-player numbers. Anything the provider leaves out is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantStats {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub damage_to_champions: u64,
    pub gold_earned: u64,
    pub vision_score: u32,
    pub wards_placed: u32,
    pub wards_killed: u32,
    pub turret_kills: u32,
    pub inhibitor_kills: u32,
    pub baron_kills: u32,
    pub dragon_kills: u32,
    pub minions_killed: u32,
    pub time_played_secs: u64,
    pub win: bool,
}

impl ParticipantStats {
    pub fn objectives(&self) -> u32 {
        self.turret_kills
            .saturating_add(self.inhibitor_kills)
            .saturating_add(self.baron_kills)
            .saturating_add(self.dragon_kills)
    }
}

impl MatchRecord {
    /// Parse and validate a match-v5 response body.
    pub fn from_riot_json(body: &str) -> Result<Self, ModelError> {
        let raw: RawMatch = serde_json::from_str(body)?;
        raw.try_into()
    }

    /// Same as [`Self::from_riot_json`] for an already decoded document.
    pub fn from_riot_value(value: serde_json::Value) -> Result<Self, ModelError> {
        let raw: RawMatch = serde_json::from_value(value)?;
        raw.try_into()
    }

    pub fn side(&self, team: TeamSide) -> impl Iterator<Item = &ParticipantRecord> {
        self.participants.iter().filter(move |p| p.team == team)
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_secs as f64 / 60.0
    }
}

// Riot sends `null` for some numbers on older matches
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(default)]
    metadata: Option<RawMetadata>,
    info: Option<RawInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default, deserialize_with = "lenient")]
    match_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInfo {
    #[serde(default, deserialize_with = "lenient")]
    game_id: i64,
    #[serde(default, deserialize_with = "lenient")]
    platform_id: String,
    #[serde(default, deserialize_with = "lenient")]
    game_creation: i64,
    #[serde(default, deserialize_with = "lenient")]
    game_duration: u64,
    #[serde(default)]
    game_end_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    game_mode: String,
    #[serde(default, deserialize_with = "lenient")]
    game_version: String,
    #[serde(default, deserialize_with = "lenient")]
    queue_id: u32,
    #[serde(default, deserialize_with = "lenient")]
    participants: Vec<RawParticipant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParticipant {
    #[serde(default, deserialize_with = "lenient")]
    puuid: String,
    #[serde(default, deserialize_with = "lenient")]
    summoner_name: String,
    #[serde(default, deserialize_with = "lenient", alias = "riotIdName")]
    riot_id_game_name: String,
    #[serde(default, deserialize_with = "lenient")]
    champion_name: String,
    #[serde(default, deserialize_with = "lenient")]
    team_id: u16,
    #[serde(default, deserialize_with = "lenient")]
    individual_position: String,
    #[serde(default, deserialize_with = "lenient")]
    team_position: String,
    #[serde(default, deserialize_with = "lenient")]
    kills: u32,
    #[serde(default, deserialize_with = "lenient")]
    deaths: u32,
    #[serde(default, deserialize_with = "lenient")]
    assists: u32,
    #[serde(default, deserialize_with = "lenient")]
    total_damage_dealt_to_champions: u64,
    #[serde(default, deserialize_with = "lenient")]
    gold_earned: u64,
    #[serde(default, deserialize_with = "lenient")]
    vision_score: u32,
    #[serde(default, deserialize_with = "lenient")]
    wards_placed: u32,
    #[serde(default, deserialize_with = "lenient")]
    wards_killed: u32,
    #[serde(default, deserialize_with = "lenient")]
    turret_kills: u32,
    #[serde(default, deserialize_with = "lenient")]
    inhibitor_kills: u32,
    #[serde(default, deserialize_with = "lenient")]
    baron_kills: u32,
    #[serde(default, deserialize_with = "lenient")]
    dragon_kills: u32,
    #[serde(default, deserialize_with = "lenient")]
    total_minions_killed: u32,
    #[serde(default, deserialize_with = "lenient")]
    neutral_minions_killed: u32,
    #[serde(default, deserialize_with = "lenient")]
    time_played: u64,
    #[serde(default, deserialize_with = "lenient")]
    win: bool,
    #[serde(default, deserialize_with = "lenient")]
    item0: u32,
    #[serde(default, deserialize_with = "lenient")]
    item1: u32,
    #[serde(default, deserialize_with = "lenient")]
    item2: u32,
    #[serde(default, deserialize_with = "lenient")]
    item3: u32,
    #[serde(default, deserialize_with = "lenient")]
    item4: u32,
    #[serde(default, deserialize_with = "lenient")]
    item5: u32,
    #[serde(default, deserialize_with = "lenient")]
    item6: u32,
}

impl RawParticipant {
    fn into_record(self, index: usize) -> Result<ParticipantRecord, ModelError> {
        let team = TeamSide::try_from(self.team_id)
            .map_err(|e| ModelError::validation(format!("participant {index}: {e}")))?;

        let name = [&self.riot_id_game_name, &self.summoner_name]
            .into_iter()
            .find(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Player {}", index + 1));

        // `teamPosition` is Riot's best guess after the game, the individual one is
        // what the player queued for
        let position = if self.team_position.is_empty() {
            &self.individual_position
        } else {
            &self.team_position
        };

        let items = [
            self.item0, self.item1, self.item2, self.item3, self.item4, self.item5, self.item6,
        ]
        .into_iter()
        .filter(|item| *item != 0)
        .collect();

        Ok(ParticipantRecord {
            puuid: self.puuid,
            name,
            champion: self.champion_name,
            role: position.as_str().into(),
            team,
            stats: ParticipantStats {
                kills: self.kills,
                deaths: self.deaths,
                assists: self.assists,
                damage_to_champions: self.total_damage_dealt_to_champions,
                gold_earned: self.gold_earned,
                vision_score: self.vision_score,
                wards_placed: self.wards_placed,
                wards_killed: self.wards_killed,
                turret_kills: self.turret_kills,
                inhibitor_kills: self.inhibitor_kills,
                baron_kills: self.baron_kills,
                dragon_kills: self.dragon_kills,
                minions_killed: self
                    .total_minions_killed
                    .saturating_add(self.neutral_minions_killed),
                time_played_secs: self.time_played,
                win: self.win,
            },
            items,
        })
    }
}

impl TryFrom<RawMatch> for MatchRecord {
    type Error = ModelError;

    fn try_from(raw: RawMatch) -> Result<Self, Self::Error> {
        let info = raw
            .info
            .ok_or_else(|| ModelError::validation("response has no `info` section"))?;

        let match_id = match raw.metadata.map(|m| m.match_id) {
            Some(id) if !id.is_empty() => id,
            _ if info.game_id != 0 && !info.platform_id.is_empty() => {
                format!("{}_{}", info.platform_id, info.game_id)
            }
            _ => return Err(ModelError::validation("response has no match id")),
        };

        let created_at = Utc
            .timestamp_millis_opt(info.game_creation)
            .single()
            .ok_or_else(|| {
                ModelError::validation(format!("game creation {} is out of range", info.game_creation))
            })?;

        // Before patch 11.20 `gameDuration` was reported in milliseconds and
        // `gameEndTimestamp` did not exist
        let duration_secs = match info.game_end_timestamp {
            Some(_) => info.game_duration,
            None => info.game_duration / 1000,
        };

        let participants = info
            .participants
            .into_iter()
            .enumerate()
            .map(|(index, participant)| participant.into_record(index))
            .collect::<Result<Vec<_>, _>>()?;

        let record = MatchRecord {
            match_id,
            created_at,
            duration_secs,
            game_mode: info.game_mode,
            game_version: info.game_version,
            queue_id: info.queue_id,
            participants,
        };
        record.validate()?;
        Ok(record)
    }
}

impl MatchRecord {
    /// Structural checks every record has to pass before it is analyzed.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.participants.is_empty() {
            return Err(ModelError::validation(format!(
                "match {} has no participants",
                self.match_id
            )));
        }

        let blue = self.side(TeamSide::Blue).count();
        let red = self.side(TeamSide::Red).count();
        if blue == 0 || red == 0 {
            return Err(ModelError::validation(format!(
                "match {} is missing a team ({blue} blue, {red} red)",
                self.match_id
            )));
        }

        if STANDARD_MODES.contains(&self.game_mode.as_str())
            && (blue != TEAM_SIZE || red != TEAM_SIZE)
        {
            return Err(ModelError::validation(format!(
                "expected {TEAM_SIZE} players per team in {}, found {blue} blue and {red} red",
                self.game_mode
            )));
        }

        Ok(())
    }
}
