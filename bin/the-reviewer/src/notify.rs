use crate::config::{WebhookConfig, WebhookKind};
use crate::error::ReviewError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::time::Duration;
use the_reviewer_analysis::format::{format_duration, format_number};
use the_reviewer_analysis::review::MAX_SCORE;
use the_reviewer_analysis::{AnalysisResult, PerformanceReport};
use tracing::debug;

const MAX_KEY_MOMENTS: usize = 3;
const MAX_INFLUENCERS: usize = 5;
const MAX_INSIGHTS: usize = 5;
const DISCLAIMER: &str = "AI generated review, it can be wrong.";

/// Delivers a finished review. Returns how many messages were sent.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        report: &PerformanceReport,
        result: &AnalysisResult,
    ) -> Result<usize, ReviewError>;
}

#[derive(Debug, Deserialize)]
struct WecomResponse {
    #[serde(default = "unknown_errcode")]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

fn unknown_errcode() -> i64 {
    -1
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    kind: WebhookKind,
    message_limit: usize,
    mention_all: bool,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Result<Self, ReviewError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReviewError::DeliveryFailed(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            kind: config.kind,
            message_limit: config.message_limit,
            mention_all: config.mention_all,
        })
    }

    fn payload(&self, content: &str, first: bool) -> Value {
        match self.kind {
            WebhookKind::Discord => json!({ "content": content }),
            WebhookKind::Wecom => {
                let mentioned: Vec<&str> = if self.mention_all && first {
                    vec!["@all"]
                } else {
                    Vec::new()
                };
                json!({
                    "msgtype": "text",
                    "text": { "content": content, "mentioned_list": mentioned },
                })
            }
        }
    }

    async fn send(&self, content: &str, first: bool) -> Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(content, first))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "webhook timed out".to_string()
                } else {
                    e.to_string()
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("webhook answered {status}"));
        }

        if self.kind == WebhookKind::Wecom {
            let body: WecomResponse = response
                .json()
                .await
                .map_err(|e| format!("unreadable webhook reply: {e}"))?;
            if body.errcode != 0 {
                return Err(format!(
                    "webhook rejected message ({}): {}",
                    body.errcode, body.errmsg
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[tracing::instrument(skip_all, fields(match_id = %result.match_id))]
    async fn notify(
        &self,
        report: &PerformanceReport,
        result: &AnalysisResult,
    ) -> Result<usize, ReviewError> {
        let message = format_message(report, result);
        let chunks = split_message(&message, self.message_limit);
        let total = chunks.len();

        for (index, chunk) in chunks.iter().enumerate() {
            debug!("Sending message {}/{total}", index + 1);
            self.send(chunk, index == 0).await.map_err(|reason| {
                ReviewError::DeliveryFailed(format!(
                    "{index} of {total} messages delivered: {reason}"
                ))
            })?;
        }
        Ok(total)
    }
}

/// Render a review for a chat channel. The summary always comes right after the
/// header so that it lands in the first message.
pub fn format_message(report: &PerformanceReport, result: &AnalysisResult) -> String {
    let mut message = String::new();
    let _ = writeln!(message, "Match review {}", result.match_id);

    let mut overview = format!(
        "{} · {}",
        report.game_mode,
        format_duration(report.duration_secs)
    );
    if let Some(winner) = report.winner() {
        let _ = write!(overview, " · {winner} side won");
    }
    let _ = writeln!(message, "{overview}");

    let _ = write!(message, "Score: {}/{MAX_SCORE}", result.score);
    if result.flagged {
        message.push_str(" (clamped, the model answered out of range)");
    }
    message.push_str("\n\n");
    let _ = writeln!(message, "{}", result.summary().trim());

    if let Some(review) = &result.review {
        if !review.key_moments.is_empty() {
            message.push_str("\nKey moments:\n");
            for moment in review.key_moments.iter().take(MAX_KEY_MOMENTS) {
                let _ = writeln!(message, "- {moment}");
            }
        }

        let influencers = review.influencers_by_impact();
        if !influencers.is_empty() {
            message.push_str("\nInfluencers:\n");
            for influencer in influencers.into_iter().take(MAX_INFLUENCERS) {
                let _ = write!(
                    message,
                    "- {} ({}) [{}] {:+.0}",
                    influencer.summoner_name,
                    influencer.role,
                    influencer.label,
                    influencer.impact_score
                );
                if !influencer.reason.is_empty() {
                    let _ = write!(message, ": {}", influencer.reason);
                }
                message.push('\n');
            }
        }

        if !review.player_insights.is_empty() {
            message.push_str("\nPlayer insights:\n");
            for (name, insight) in review.player_insights.iter().take(MAX_INSIGHTS) {
                let _ = write!(message, "- {name}: {}", insight.short);
                if !insight.advice.is_empty() {
                    let _ = write!(message, " Advice: {}", insight.advice);
                }
                message.push('\n');
            }
        }
    }

    if let Some(best) = report.best() {
        let _ = writeln!(
            message,
            "\nTop performer: {} ({}) {}/{}/{}, {} damage, {} gold, rating {}/100",
            best.name,
            best.champion,
            best.kills,
            best.deaths,
            best.assists,
            format_number(best.total_damage),
            format_number(best.gold_earned),
            best.rating
        );
    }

    let _ = write!(
        message,
        "Generated {} by {}. {DISCLAIMER}",
        result.generated_at.format("%Y-%m-%d %H:%M UTC"),
        result.model
    );
    message
}

/// Split `text` into chunks of at most `limit` characters, breaking on line
/// boundaries where possible. A line that does not fit is cut into the room left
/// when it would not fit a chunk of its own, or when the first chunk is still
/// open, so the opening of the message always lands in the first chunk.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();
        let separator = usize::from(!current.is_empty());
        if current_len + separator + line_len <= limit {
            if separator == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += separator + line_len;
            continue;
        }

        let mut rest = line;
        let room = limit.saturating_sub(current_len + separator);
        if room > 0 && (chunks.is_empty() || line_len > limit) {
            let cut = rest.char_indices().nth(room).map_or(rest.len(), |(i, _)| i);
            if separator == 1 {
                current.push('\n');
            }
            current.push_str(&rest[..cut]);
            rest = &rest[cut..];
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        current_len = 0;

        let chars: Vec<char> = rest.chars().collect();
        for piece in chars.chunks(limit) {
            if piece.len() == limit {
                chunks.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}
