use crate::model::{MatchRecord, ParticipantRecord, TeamSide};
use crate::report::{MatchTotals, PerformanceReport, PlayerPerformance, TeamSummary};
use crate::scoring::{RatingInputs, ScoringTiers};
use serde::Deserialize;
use std::cmp::Ordering;

/// Turns a [`MatchRecord`] into a [`PerformanceReport`]. Pure and deterministic.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MatchAnalyzer {
    scoring: ScoringTiers,
}

impl MatchAnalyzer {
    pub fn new(scoring: ScoringTiers) -> Self {
        Self { scoring }
    }

    pub fn analyze(&self, record: &MatchRecord) -> PerformanceReport {
        let teams: Vec<TeamSummary> = TeamSide::ALL
            .into_iter()
            .map(|side| summarize_team(record, side))
            .collect();

        let mut players: Vec<PlayerPerformance> = record
            .participants
            .iter()
            .enumerate()
            .map(|(index, participant)| {
                let team = teams.iter().find(|team| team.side == participant.team);
                self.analyze_player(record, index, participant, team)
            })
            .collect();

        players.sort_by(rank_order);
        for (position, player) in players.iter_mut().enumerate() {
            player.rank = position + 1;
        }

        let totals = MatchTotals {
            kills: total(teams.iter().map(|t| t.kills)),
            deaths: total(teams.iter().map(|t| t.deaths)),
            assists: total(teams.iter().map(|t| t.assists)),
            gold: total_u64(teams.iter().map(|t| t.gold)),
            damage: total_u64(teams.iter().map(|t| t.damage)),
        };

        PerformanceReport {
            match_id: record.match_id.clone(),
            game_mode: record.game_mode.clone(),
            game_version: record.game_version.clone(),
            queue_id: record.queue_id,
            started_at: record.created_at,
            duration_secs: record.duration_secs,
            players,
            teams,
            totals,
        }
    }

    fn analyze_player(
        &self,
        record: &MatchRecord,
        index: usize,
        participant: &ParticipantRecord,
        team: Option<&TeamSummary>,
    ) -> PlayerPerformance {
        let stats = &participant.stats;

        // Fall back to the game length when the per-player time is missing
        let seconds = match stats.time_played_secs {
            0 => record.duration_secs,
            secs => secs,
        };
        let minutes = (seconds as f64 / 60.0).max(1.0);

        let kda = kda(stats.kills, stats.deaths, stats.assists);
        let gold_per_minute = stats.gold_earned as f64 / minutes;
        let damage_per_minute = stats.damage_to_champions as f64 / minutes;
        let team_kills = team.map(|t| t.kills).unwrap_or_default();
        let team_damage = team.map(|t| t.damage).unwrap_or_default();
        let kill_participation = ratio(
            f64::from(stats.kills) + f64::from(stats.assists),
            team_kills as f64,
        )
        .min(1.0);
        let damage_share = ratio(stats.damage_to_champions as f64, team_damage as f64);
        let objectives = stats.objectives();

        let rating = self.scoring.rating(&RatingInputs {
            kda,
            gold_per_minute,
            damage_per_minute,
            vision_score: stats.vision_score as f64,
            objectives: objectives as f64,
            kill_participation,
        });

        PlayerPerformance {
            rank: 0,
            participant_index: index,
            puuid: participant.puuid.clone(),
            name: participant.name.clone(),
            champion: participant.champion.clone(),
            role: participant.role,
            team: participant.team,
            win: stats.win,
            kills: stats.kills,
            deaths: stats.deaths,
            assists: stats.assists,
            kda,
            gold_earned: stats.gold_earned,
            gold_per_minute: round2(gold_per_minute),
            total_damage: stats.damage_to_champions,
            damage_per_minute: round2(damage_per_minute),
            damage_share: round2(damage_share * 100.0),
            kill_participation: round2(kill_participation * 100.0),
            vision_score: stats.vision_score,
            wards_placed: stats.wards_placed,
            wards_killed: stats.wards_killed,
            objectives,
            objective_score: self.scoring.objective_points(objectives),
            cs: stats.minions_killed,
            cs_per_minute: round2(stats.minions_killed as f64 / minutes),
            rating,
        }
    }
}

/// Kills plus assists over deaths, with zero deaths counting as one.
pub fn kda(kills: u32, deaths: u32, assists: u32) -> f64 {
    let deaths = deaths.max(1);
    round2((f64::from(kills) + f64::from(assists)) / f64::from(deaths))
}

fn summarize_team(record: &MatchRecord, side: TeamSide) -> TeamSummary {
    let members: Vec<&ParticipantRecord> = record.side(side).collect();
    let kills = total(members.iter().map(|p| p.stats.kills));
    let deaths = total(members.iter().map(|p| p.stats.deaths));
    let assists = total(members.iter().map(|p| p.stats.assists));

    TeamSummary {
        side,
        kills,
        deaths,
        assists,
        kda: kda(kills, deaths, assists),
        gold: total_u64(members.iter().map(|p| p.stats.gold_earned)),
        damage: total_u64(members.iter().map(|p| p.stats.damage_to_champions)),
        win: members.iter().any(|p| p.stats.win),
        members: members.iter().map(|p| p.name.clone()).collect(),
    }
}

/// Rating first, then damage dealt, then participant order.
fn rank_order(a: &PlayerPerformance, b: &PlayerPerformance) -> Ordering {
    b.rating
        .cmp(&a.rating)
        .then_with(|| b.total_damage.cmp(&a.total_damage))
        .then_with(|| a.participant_index.cmp(&b.participant_index))
}

// Provider numbers are not bounded, so sums saturate
fn total(values: impl Iterator<Item = u32>) -> u32 {
    values.fold(0, u32::saturating_add)
}

fn total_u64(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        part / whole
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
