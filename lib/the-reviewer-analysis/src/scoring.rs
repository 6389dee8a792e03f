use serde::{Deserialize, Serialize};

/// A single step of a [`TierTable`]: values at or above `min` are worth `points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub min: f64,
    pub points: u8,
}

/// Step function from a metric to rating points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    tiers: Vec<Tier>,
    /// Points given when no tier is reached
    floor: u8,
}

impl TierTable {
    pub fn new(tiers: Vec<Tier>, floor: u8) -> Self {
        Self { tiers, floor }
    }

    fn from_pairs(pairs: &[(f64, u8)], floor: u8) -> Self {
        let tiers = pairs
            .iter()
            .map(|&(min, points)| Tier { min, points })
            .collect();
        Self { tiers, floor }
    }

    /// Points of the highest tier `value` reaches.
    pub fn score(&self, value: f64) -> u8 {
        self.tiers
            .iter()
            .filter(|tier| value >= tier.min)
            .max_by(|a, b| a.min.total_cmp(&b.min))
            .map(|tier| tier.points)
            .unwrap_or(self.floor)
    }
}

/// Inputs of the aggregate rating, already normalized per minute.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingInputs {
    pub kda: f64,
    pub gold_per_minute: f64,
    pub damage_per_minute: f64,
    pub vision_score: f64,
    pub objectives: f64,
    /// Fraction in `0.0..=1.0`
    pub kill_participation: f64,
}

/// Tables used to turn player metrics into a 0-100 rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTiers {
    pub kda: TierTable,
    pub gold_per_minute: TierTable,
    pub damage_per_minute: TierTable,
    pub vision_score: TierTable,
    pub objectives: TierTable,
    /// Keyed on kill participation as a fraction. Empty by default.
    pub kill_participation: TierTable,
}

impl Default for ScoringTiers {
    fn default() -> Self {
        Self {
            kda: TierTable::from_pairs(&[(5.0, 30), (3.0, 25), (2.0, 20), (1.0, 15)], 10),
            gold_per_minute: TierTable::from_pairs(&[(400.0, 20), (300.0, 15), (200.0, 10)], 5),
            damage_per_minute: TierTable::from_pairs(
                &[(1000.0, 20), (600.0, 15), (300.0, 10)],
                5,
            ),
            vision_score: TierTable::from_pairs(&[(50.0, 15), (30.0, 12), (15.0, 8)], 4),
            objectives: TierTable::from_pairs(&[(5.0, 15), (3.0, 12), (1.0, 8)], 4),
            kill_participation: TierTable::from_pairs(&[], 0),
        }
    }
}

impl ScoringTiers {
    pub fn objective_points(&self, objectives: u32) -> u8 {
        self.objectives.score(objectives as f64)
    }

    pub fn rating(&self, inputs: &RatingInputs) -> u8 {
        let total: u32 = [
            self.kda.score(inputs.kda),
            self.gold_per_minute.score(inputs.gold_per_minute),
            self.damage_per_minute.score(inputs.damage_per_minute),
            self.vision_score.score(inputs.vision_score),
            self.objectives.score(inputs.objectives),
            self.kill_participation.score(inputs.kill_participation),
        ]
        .into_iter()
        .map(u32::from)
        .sum();
        total.min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_game_is_capped() {
        let tiers = ScoringTiers::default();
        let inputs = RatingInputs {
            kda: 10.0,
            gold_per_minute: 500.0,
            damage_per_minute: 1500.0,
            vision_score: 60.0,
            objectives: 10.0,
            kill_participation: 0.9,
        };
        assert_eq!(tiers.rating(&inputs), 100);
    }

    #[test]
    fn average_game() {
        let tiers = ScoringTiers::default();
        let inputs = RatingInputs {
            kda: 2.5,
            gold_per_minute: 250.0,
            damage_per_minute: 500.0,
            vision_score: 20.0,
            objectives: 2.0,
            kill_participation: 0.5,
        };
        // 20 + 10 + 10 + 8 + 8
        assert_eq!(tiers.rating(&inputs), 56);
    }

    #[test]
    fn empty_game_gets_floors() {
        let tiers = ScoringTiers::default();
        assert_eq!(tiers.rating(&RatingInputs::default()), 10 + 5 + 5 + 4 + 4);
    }

    #[test]
    fn tier_order_does_not_matter() {
        let table = TierTable::new(
            vec![
                Tier { min: 1.0, points: 1 },
                Tier { min: 3.0, points: 3 },
                Tier { min: 2.0, points: 2 },
            ],
            0,
        );
        assert_eq!(table.score(2.5), 2);
        assert_eq!(table.score(3.0), 3);
        assert_eq!(table.score(0.5), 0);
    }

    #[test]
    fn partial_tiers_keep_defaults() {
        let tiers: ScoringTiers = serde_json::from_str(
            r#"{ "kill_participation": { "tiers": [{ "min": 0.5, "points": 10 }], "floor": 0 } }"#,
        )
        .unwrap();
        assert_eq!(tiers.kill_participation.score(0.6), 10);
        assert_eq!(tiers.kda, ScoringTiers::default().kda);
    }
}
