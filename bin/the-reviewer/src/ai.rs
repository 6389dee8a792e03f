use crate::config::AiConfig;
use crate::error::ReviewError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use the_reviewer_analysis::{AnalysisResult, Prompt};
use tracing::{debug, warn};

/// Turns a prompt into a scored review.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<AnalysisResult, ReviewError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl ApiError {
    fn is_quota(&self) -> bool {
        [self.code.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .any(|value| value == "insufficient_quota")
    }
}

/// Client for an OpenAI compatible `/chat/completions` endpoint. One request per
/// prompt, no retries.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &AiConfig) -> Result<Self, ReviewError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReviewError::ServiceUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ReportGenerator for OpenAiClient {
    #[tracing::instrument(skip_all, fields(match_id = %prompt.match_id))]
    async fn generate(&self, prompt: &Prompt) -> Result<AnalysisResult, ReviewError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReviewError::ServiceUnavailable(describe(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReviewError::ServiceUnavailable(describe(&e)))?;
        debug!("AI endpoint answered {status}");

        if !status.is_success() {
            return Err(map_status(status, &body));
        }

        let content = serde_json::from_str::<ChatResponse>(&body)
            .map_err(|e| ReviewError::InvalidResponse(format!("unexpected response body: {e}")))?
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ReviewError::InvalidResponse("response has no content".to_string()))?;

        let result =
            AnalysisResult::from_model_output(&prompt.match_id, &self.model, &content, Utc::now())
                .map_err(|e| ReviewError::InvalidResponse(e.to_string()))?;
        if result.flagged {
            warn!("Model score for {} was out of range and got clamped", prompt.match_id);
        }
        Ok(result)
    }
}

fn map_status(status: StatusCode, body: &str) -> ReviewError {
    let api_error = serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error);
    let message = api_error
        .as_ref()
        .map(|error| error.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS || api_error.as_ref().is_some_and(ApiError::is_quota) {
        return ReviewError::QuotaExceeded(message);
    }
    if status.is_server_error()
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return ReviewError::ServiceUnavailable(format!("{status}: {message}"));
    }
    ReviewError::InvalidResponse(format!("{status}: {message}"))
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_are_recognized_by_code() {
        let body = r#"{"error": {"message": "You exceeded your current quota", "type": "insufficient_quota", "code": "insufficient_quota"}}"#;
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, body),
            ReviewError::QuotaExceeded(message) if message.contains("quota")
        ));
    }

    #[test]
    fn auth_and_server_errors_mean_unavailable() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, ""),
            ReviewError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "<html>"),
            ReviewError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "{}"),
            ReviewError::InvalidResponse(_)
        ));
    }
}
