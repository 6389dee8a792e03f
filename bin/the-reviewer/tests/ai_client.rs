use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use the_reviewer::ai::{OpenAiClient, ReportGenerator};
use the_reviewer::config::AiConfig;
use the_reviewer::ReviewError;
use the_reviewer_analysis::Prompt;

mod common;

fn prompt() -> Prompt {
    Prompt {
        match_id: "KR_7000000001".to_string(),
        system: "You review League of Legends matches.".to_string(),
        user: "Match data follows.".to_string(),
    }
}

fn config(base_url: String) -> AiConfig {
    AiConfig {
        api_key: "sk-test".to_string(),
        base_url,
        model: "gpt-4o-mini".to_string(),
        timeout_secs: 1,
        ..Default::default()
    }
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
    })
}

/// Mock endpoint answering every request with `status` and `body`.
async fn mock(status: StatusCode, body: Value) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    );
    format!("{}/v1", common::serve(router).await)
}

#[tokio::test]
async fn out_of_range_score_is_clamped_and_flagged() {
    let seen: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::default();
    let recorder = seen.clone();
    let answer = completion(
        "Here you go:\n```json\n{\"summary\": \"Faker carried\", \"overall_score\": 150, \"influencers\": [{\"summoner_name\": \"Faker\", \"label\": \"carried\", \"impact_score\": 250}]}\n```",
    );
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(request): Json<Value>| {
            let answer = answer.clone();
            *recorder.lock().unwrap() = Some((headers, request));
            async move { Json(answer) }
        }),
    );
    let base_url = format!("{}/v1", common::serve(router).await);

    let client = OpenAiClient::new(&config(base_url)).unwrap();
    let result = client.generate(&prompt()).await.unwrap();

    assert_eq!(result.score, 100);
    assert!(result.flagged);
    assert_eq!(result.model, "gpt-4o-mini");
    let review = result.review.unwrap();
    assert_eq!(review.summary, "Faker carried");
    assert_eq!(review.influencers[0].impact_score, 100.0);

    let (headers, request) = seen.lock().unwrap().take().unwrap();
    assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-test");
    assert_eq!(request["model"], "gpt-4o-mini");
    assert_eq!(request["max_tokens"], 1500);
    assert_eq!(request["messages"][0]["role"], "system");
    assert_eq!(request["messages"][1]["content"], "Match data follows.");
}

#[tokio::test]
async fn plain_text_score_is_accepted() {
    let base_url = mock(
        StatusCode::OK,
        completion("Solid game from blue side. Overall score: 72"),
    )
    .await;
    let result = OpenAiClient::new(&config(base_url))
        .unwrap()
        .generate(&prompt())
        .await
        .unwrap();
    assert_eq!(result.score, 72);
    assert!(!result.flagged);
    assert!(result.review.is_none());
    assert_eq!(result.summary(), "Solid game from blue side. Overall score: 72");
}

#[tokio::test]
async fn answer_without_score_is_invalid() {
    let base_url = mock(StatusCode::OK, completion("I cannot review this match.")).await;
    let error = OpenAiClient::new(&config(base_url))
        .unwrap()
        .generate(&prompt())
        .await
        .unwrap_err();
    assert!(matches!(error, ReviewError::InvalidResponse(_)), "{error:?}");
}

#[tokio::test]
async fn empty_choices_are_invalid() {
    let base_url = mock(StatusCode::OK, json!({"choices": []})).await;
    let error = OpenAiClient::new(&config(base_url))
        .unwrap()
        .generate(&prompt())
        .await
        .unwrap_err();
    assert!(matches!(error, ReviewError::InvalidResponse(_)), "{error:?}");
}

#[tokio::test]
async fn throttling_is_quota_exceeded() {
    let base_url = mock(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}),
    )
    .await;
    let error = OpenAiClient::new(&config(base_url))
        .unwrap()
        .generate(&prompt())
        .await
        .unwrap_err();
    assert!(matches!(error, ReviewError::QuotaExceeded(_)), "{error:?}");
}

#[tokio::test]
async fn server_errors_are_service_unavailable() {
    let base_url = mock(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;
    let error = OpenAiClient::new(&config(base_url))
        .unwrap()
        .generate(&prompt())
        .await
        .unwrap_err();
    assert!(matches!(error, ReviewError::ServiceUnavailable(_)), "{error:?}");

    let error = OpenAiClient::new(&config(common::closed_url().await))
        .unwrap()
        .generate(&prompt())
        .await
        .unwrap_err();
    assert!(matches!(error, ReviewError::ServiceUnavailable(_)), "{error:?}");
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(completion("score: 50"))
        }),
    );
    let base_url = format!("{}/v1", common::serve(router).await);

    let error = OpenAiClient::new(&config(base_url))
        .unwrap()
        .generate(&prompt())
        .await
        .unwrap_err();
    assert_eq!(
        error,
        ReviewError::ServiceUnavailable("request timed out".to_string())
    );
}
