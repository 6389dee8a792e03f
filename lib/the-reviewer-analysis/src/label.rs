use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// How a player swung the outcome of the game, as judged by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum InfluenceLabel {
    Carried,
    Fed,
    Trolling,
    #[default]
    Neutral,
}

impl InfluenceLabel {
    pub const ALL: [InfluenceLabel; 4] = [
        InfluenceLabel::Carried,
        InfluenceLabel::Fed,
        InfluenceLabel::Trolling,
        InfluenceLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InfluenceLabel::Carried => "carried",
            InfluenceLabel::Fed => "fed",
            InfluenceLabel::Trolling => "trolling",
            InfluenceLabel::Neutral => "neutral",
        }
    }
}

impl From<&str> for InfluenceLabel {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "carried" | "carry" => InfluenceLabel::Carried,
            "fed" | "feeding" => InfluenceLabel::Fed,
            "trolling" | "troll" => InfluenceLabel::Trolling,
            _ => InfluenceLabel::Neutral,
        }
    }
}

// Models are loose with casing, and anything unknown is neutral
impl<'de> Deserialize<'de> for InfluenceLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(value.as_str().into())
    }
}

impl Display for InfluenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
