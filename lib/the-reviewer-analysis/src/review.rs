use crate::error::ModelError;
use crate::label::InfluenceLabel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const MAX_SCORE: u8 = 100;
const MAX_IMPACT: f64 = 100.0;

lazy_static::lazy_static! {
    static ref FENCED_JSON: regex::Regex =
        regex::Regex::new(r"(?i)```(?:json)?\s*(\{[\s\S]*?\})\s*```").expect("valid regex");
    static ref LABELLED_SCORE: regex::Regex =
        regex::Regex::new(r#"(?i)\b(?:overall[_ ]?score|score|rating)\b["']?\s*[:=]\s*(-?\d+(?:\.\d+)?)"#)
            .expect("valid regex");
    static ref OUT_OF_HUNDRED: regex::Regex =
        regex::Regex::new(r"(-?\d+(?:\.\d+)?)\s*/\s*100\b").expect("valid regex");
}

/// The JSON object the model is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AiReview {
    #[serde(deserialize_with = "text")]
    pub match_id: String,
    #[serde(deserialize_with = "text")]
    pub summary: String,
    #[serde(deserialize_with = "optional_number")]
    pub overall_score: Option<f64>,
    #[serde(deserialize_with = "texts")]
    pub key_moments: Vec<String>,
    pub influencers: Vec<Influencer>,
    pub player_insights: BTreeMap<String, PlayerInsight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Influencer {
    #[serde(deserialize_with = "text")]
    pub summoner_name: String,
    #[serde(deserialize_with = "text")]
    pub role: String,
    #[serde(deserialize_with = "label")]
    pub label: InfluenceLabel,
    #[serde(deserialize_with = "text")]
    pub reason: String,
    /// Positive helped the team, negative hurt it. Within -100..=100.
    #[serde(deserialize_with = "number")]
    pub impact_score: f64,
    /// Within 0..=100
    #[serde(deserialize_with = "number")]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlayerInsight {
    #[serde(deserialize_with = "text")]
    pub label: String,
    #[serde(deserialize_with = "text")]
    pub short: String,
    #[serde(deserialize_with = "text", alias = "suggestion")]
    pub advice: String,
}

impl AiReview {
    fn normalize(&mut self) {
        for influencer in &mut self.influencers {
            influencer.impact_score = influencer.impact_score.clamp(-MAX_IMPACT, MAX_IMPACT);
            influencer.confidence = influencer.confidence.clamp(0.0, 100.0);
        }
    }

    /// Influencers ordered by how much they swung the game, either way.
    pub fn influencers_by_impact(&self) -> Vec<&Influencer> {
        let mut sorted: Vec<&Influencer> = self.influencers.iter().collect();
        sorted.sort_by(|a, b| b.impact_score.abs().total_cmp(&a.impact_score.abs()));
        sorted
    }
}

/// Outcome of the generation step for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub match_id: String,
    /// Model output as returned
    pub raw_text: String,
    /// Present when the model followed the requested JSON schema
    pub review: Option<AiReview>,
    pub score: u8,
    /// The returned score was outside of 0-100 and got clamped
    pub flagged: bool,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn from_model_output(
        match_id: &str,
        model: &str,
        text: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        let parsed = parse_model_output(text)?;
        let (score, flagged) = validate_score(parsed.raw_score)?;
        Ok(Self {
            match_id: match_id.to_string(),
            raw_text: text.to_string(),
            review: parsed.review,
            score,
            flagged,
            model: model.to_string(),
            generated_at,
        })
    }

    pub fn summary(&self) -> &str {
        self.review
            .as_ref()
            .map(|review| review.summary.as_str())
            .filter(|summary| !summary.is_empty())
            .unwrap_or(self.raw_text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    pub review: Option<AiReview>,
    pub raw_score: f64,
}

/// Pull the review and score out of free-form model text.
///
/// The first JSON object wins, looking at fenced blocks before bare braces, and
/// its `overall_score` is the only score taken from it. When no usable object is
/// found the text is searched for a `score: N` or `N/100`.
pub fn parse_model_output(text: &str) -> Result<ParsedOutput, ModelError> {
    let review = extract_json(text).and_then(|candidate| {
        serde_json::from_str::<AiReview>(candidate)
            .ok()
            .map(|mut review| {
                review.normalize();
                review
            })
    });

    let raw_score = match &review {
        Some(review) => review.overall_score,
        None => find_score(text),
    }
    .ok_or_else(|| ModelError::UnusableOutput("no score found in model output".into()))?;

    Ok(ParsedOutput { review, raw_score })
}

pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(block) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return Some(block.as_str());
    }
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    (last > first).then(|| &text[first..=last])
}

fn find_score(text: &str) -> Option<f64> {
    [&*LABELLED_SCORE, &*OUT_OF_HUNDRED]
        .into_iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .and_then(|score| score.as_str().parse().ok())
}

/// Round into `0..=100`. The flag is set when the value had to be clamped.
pub fn validate_score(raw: f64) -> Result<(u8, bool), ModelError> {
    if !raw.is_finite() {
        return Err(ModelError::UnusableOutput(format!("score {raw} is not a number")));
    }
    let max = f64::from(MAX_SCORE);
    let flagged = !(0.0..=max).contains(&raw);
    Ok((raw.clamp(0.0, max).round() as u8, flagged))
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

fn texts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s],
        _ => Vec::new(),
    })
}

fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches("/100").trim().parse().ok(),
        _ => None,
    })
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(optional_number(deserializer)?.unwrap_or_default())
}

fn label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<InfluenceLabel, D::Error> {
    Ok(Option::<InfluenceLabel>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const REVIEW: &str = r#"{
        "match_id": "KR_1",
        "summary": "Blue won on the back of an early mid lead",
        "overall_score": 82,
        "key_moments": ["12:30 mid skirmish", {"minute": 20}],
        "influencers": [
            {"summoner_name": "Faker", "role": "mid", "label": "Carried", "reason": "solo kills", "impact_score": 40, "confidence": 92},
            {"summoner_name": "Feeder", "role": "top", "label": "fed", "reason": "died 12 times", "impact_score": -250, "confidence": "140"},
            {"summoner_name": "Quiet", "label": "afk"}
        ],
        "player_insights": {"Faker": {"short": "great roams", "suggestion": "ward deeper"}}
    }"#;

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn parses_review_object() {
        let result = AnalysisResult::from_model_output("KR_1", "gpt", REVIEW, at()).unwrap();
        let review = result.review.as_ref().unwrap();
        assert_eq!(result.score, 82);
        assert!(!result.flagged);
        assert_eq!(review.key_moments, vec!["12:30 mid skirmish", r#"{"minute":20}"#]);
        assert_eq!(review.influencers[0].label, InfluenceLabel::Carried);
        assert_eq!(review.influencers[1].impact_score, -100.0);
        assert_eq!(review.influencers[1].confidence, 100.0);
        assert_eq!(review.influencers[2].label, InfluenceLabel::Neutral);
        assert_eq!(review.player_insights["Faker"].advice, "ward deeper");
        assert_eq!(result.summary(), "Blue won on the back of an early mid lead");
    }

    #[test]
    fn fenced_block_is_preferred() {
        let text = "Here you go {not json}\n```json\n{\"overall_score\": 55}\n```\nthanks";
        assert_eq!(extract_json(text), Some("{\"overall_score\": 55}"));
        assert_eq!(parse_model_output(text).unwrap().raw_score, 55.0);
    }

    #[test]
    fn out_of_range_scores_are_clamped_and_flagged() {
        assert_eq!(validate_score(150.0).unwrap(), (100, true));
        assert_eq!(validate_score(-3.0).unwrap(), (0, true));
        assert_eq!(validate_score(99.6).unwrap(), (100, false));
        assert_eq!(validate_score(0.0).unwrap(), (0, false));

        let result =
            AnalysisResult::from_model_output("KR_1", "gpt", r#"{"overall_score": 250}"#, at())
                .unwrap();
        assert_eq!(result.score, 100);
        assert!(result.flagged);
    }

    #[test]
    fn plain_text_score_is_used() {
        let text = "Solid game overall. Score: 71. Keep warding.";
        let result = AnalysisResult::from_model_output("KR_1", "gpt", text, at()).unwrap();
        assert_eq!(result.score, 71);
        assert!(result.review.is_none());
        assert_eq!(result.summary(), text);

        let parsed = parse_model_output("I'd give this team 64/100").unwrap();
        assert_eq!(parsed.raw_score, 64.0);
    }

    #[test]
    fn missing_score_is_unusable() {
        let err = parse_model_output("no idea, sorry").unwrap_err();
        assert!(matches!(err, ModelError::UnusableOutput(_)));
    }

    #[test]
    fn review_without_overall_score_is_unusable() {
        let text = r#"{"summary": "x", "influencers": [{"summoner_name": "A", "impact_score": -250, "confidence": 90}]}"#;
        let err = parse_model_output(text).unwrap_err();
        assert!(matches!(err, ModelError::UnusableOutput(_)));

        let fenced = format!("Score: 70\n```json\n{text}\n```");
        assert!(parse_model_output(&fenced).is_err());
    }

    #[test]
    fn impact_score_is_not_a_match_score() {
        assert_eq!(find_score(r#"impact_score: -40, the game was lost"#), None);
        assert_eq!(find_score("overall_score = 66"), Some(66.0));
        assert_eq!(find_score("Rating: 58"), Some(58.0));
    }

    #[test]
    fn influencers_sorted_by_absolute_impact() {
        let review: AiReview = serde_json::from_str(REVIEW).unwrap();
        let names: Vec<&str> = review
            .influencers_by_impact()
            .into_iter()
            .map(|i| i.summoner_name.as_str())
            .collect();
        assert_eq!(names, vec!["Feeder", "Faker", "Quiet"]);
    }
}
