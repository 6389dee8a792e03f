use crate::model::TeamSide;
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything derived from one match. Players are ordered best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub match_id: String,
    pub game_mode: String,
    pub game_version: String,
    pub queue_id: u32,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub players: Vec<PlayerPerformance>,
    pub teams: Vec<TeamSummary>,
    pub totals: MatchTotals,
}

impl PerformanceReport {
    pub fn best(&self) -> Option<&PlayerPerformance> {
        self.players.first()
    }

    pub fn worst(&self) -> Option<&PlayerPerformance> {
        self.players.last()
    }

    pub fn team(&self, side: TeamSide) -> Option<&TeamSummary> {
        self.teams.iter().find(|team| team.side == side)
    }

    pub fn winner(&self) -> Option<TeamSide> {
        self.teams.iter().find(|team| team.win).map(|team| team.side)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformance {
    /// 1 is the best performer of the match
    pub rank: usize,
    /// Position of the player in the original participant list
    pub participant_index: usize,
    pub puuid: String,
    pub name: String,
    pub champion: String,
    pub role: Role,
    pub team: TeamSide,
    pub win: bool,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub kda: f64,
    pub gold_earned: u64,
    pub gold_per_minute: f64,
    pub total_damage: u64,
    pub damage_per_minute: f64,
    /// Percentage of the team's damage to champions
    pub damage_share: f64,
    /// Percentage of the team's kills the player took part in
    pub kill_participation: f64,
    pub vision_score: u32,
    pub wards_placed: u32,
    pub wards_killed: u32,
    pub objectives: u32,
    pub objective_score: u8,
    pub cs: u32,
    pub cs_per_minute: f64,
    pub rating: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub side: TeamSide,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub kda: f64,
    pub gold: u64,
    pub damage: u64,
    pub win: bool,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTotals {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub gold: u64,
    pub damage: u64,
}
