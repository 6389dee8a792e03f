use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use riven::consts::RegionalRoute;
use riven::{RiotApi, RiotApiConfig};
use std::sync::Arc;
use std::time::Duration;
use the_reviewer::riot_api::{MatchSource, RiotMatchFetcher};
use the_reviewer::ReviewError;
use the_reviewer_analysis::role::Role;
use the_reviewer_analysis::TeamSide;

mod common;

const FULL_MATCH: &str = include_str!("fixtures/match_v5_full.json");

/// Fake match-v5: `KR_7000000001` is a complete ranked game, `KR_404` does not
/// exist and everything else is rate limited.
async fn get_match(Path(match_id): Path<String>) -> Response {
    match match_id.as_str() {
        "KR_7000000001" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            FULL_MATCH,
        )
            .into_response(),
        "KR_404" => (StatusCode::NOT_FOUND, [("retry-after", "0")], "{}").into_response(),
        _ => (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "7")], "{}").into_response(),
    }
}

async fn fetcher() -> RiotMatchFetcher {
    let router = Router::new()
        .route("/lol/match/v5/matches/:match_id", get(get_match))
        .route(
            "/riot/account/v1/accounts/by-riot-id/:game_name/:tag_line",
            get(|| async { (StatusCode::NOT_FOUND, "{}") }),
        );
    let base_url = common::serve(router).await;

    let config = RiotApiConfig::with_key("RGAPI-test")
        .set_retries(0)
        .set_base_url(base_url);
    RiotMatchFetcher::new(
        Arc::new(RiotApi::new(config)),
        RegionalRoute::ASIA,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn fetched_match_becomes_a_record() {
    let record = fetcher().await.fetch_match("KR_7000000001").await.unwrap();

    assert_eq!(record.match_id, "KR_7000000001");
    assert_eq!(record.created_at.timestamp_millis(), 1_717_000_000_000);
    assert_eq!(record.duration_secs, 1800);
    assert_eq!(record.game_mode, "CLASSIC");
    assert_eq!(record.queue_id, 420);
    assert_eq!(record.participants.len(), 10);
    assert_eq!(record.side(TeamSide::Blue).count(), 5);
    assert_eq!(record.side(TeamSide::Red).count(), 5);

    let faker = record
        .participants
        .iter()
        .find(|p| p.puuid == "puuid-faker")
        .unwrap();
    assert_eq!(faker.name, "Faker");
    assert_eq!(faker.champion, "Ahri");
    assert_eq!(faker.role, Role::Mid);
    assert_eq!(faker.team, TeamSide::Blue);
    assert!(faker.stats.win);
    assert_eq!(record, common::ranked_match());
}

#[tokio::test]
async fn missing_match_is_not_found() {
    let error = fetcher().await.fetch_match("KR_404").await.unwrap_err();
    assert!(matches!(error, ReviewError::NotFound(_)), "{error:?}");
}

#[tokio::test]
async fn throttled_match_carries_retry_hint() {
    let error = fetcher().await.fetch_match("KR_1").await.unwrap_err();
    assert_eq!(
        error,
        ReviewError::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        }
    );
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let fetcher = fetcher().await;
    let error = fetcher
        .recent_match_ids("Nobody#KR1", 5)
        .await
        .unwrap_err();
    assert!(matches!(error, ReviewError::NotFound(_)), "{error:?}");

    let error = fetcher.recent_match_ids("no tag", 5).await.unwrap_err();
    assert!(matches!(error, ReviewError::ValidationError(_)), "{error:?}");
}

#[tokio::test]
async fn unreachable_api_is_a_transport_error() {
    let config = RiotApiConfig::with_key("RGAPI-test")
        .set_retries(0)
        .set_base_url(common::closed_url().await);
    let fetcher = RiotMatchFetcher::new(
        Arc::new(RiotApi::new(config)),
        RegionalRoute::ASIA,
        Duration::from_secs(5),
    );
    let error = fetcher.fetch_match("KR_1").await.unwrap_err();
    assert!(matches!(error, ReviewError::TransportError(_)), "{error:?}");
}
