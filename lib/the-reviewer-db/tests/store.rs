use chrono::{TimeZone, Utc};
use std::time::Duration;
use the_reviewer_analysis::model::{ParticipantRecord, ParticipantStats};
use the_reviewer_analysis::role::Role;
use the_reviewer_analysis::{MatchRecord, TeamSide};
use the_reviewer_db::model::{NewReview, ReviewStatus};
use the_reviewer_db::{DbHandler, SqlitePoolOptions};

async fn db() -> DbHandler {
    // A single connection so every query sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = DbHandler::new(pool);
    db.migrate().await.unwrap();
    db
}

fn record(match_id: &str) -> MatchRecord {
    let participant = |name: &str, team| ParticipantRecord {
        puuid: format!("puuid-{name}"),
        name: name.to_string(),
        champion: "Lux".to_string(),
        role: Role::Support,
        team,
        stats: ParticipantStats {
            kills: 2,
            ..Default::default()
        },
        items: vec![3853],
    };
    MatchRecord {
        match_id: match_id.to_string(),
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        duration_secs: 1500,
        game_mode: "CUSTOM".to_string(),
        game_version: "14.3".to_string(),
        queue_id: 0,
        participants: vec![
            participant("a", TeamSide::Blue),
            participant("b", TeamSide::Red),
        ],
    }
}

#[tokio::test]
async fn cached_match_is_returned_while_fresh() {
    let db = db().await;
    let original = record("KR_1");
    db.insert_cached_match(&original).await.unwrap();

    let cached = db
        .get_cached_match("KR_1", Duration::from_secs(3600))
        .await
        .unwrap();
    assert_eq!(cached, Some(original));
    assert_eq!(
        db.get_cached_match("KR_2", Duration::from_secs(3600))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn expired_match_is_evicted() {
    let db = db().await;
    db.insert_cached_match(&record("KR_1")).await.unwrap();

    let cached = db.get_cached_match("KR_1", Duration::ZERO).await.unwrap();
    assert_eq!(cached, None);
    // Already gone, nothing left to remove
    assert!(!db.remove_cached_match("KR_1").await.unwrap());
}

#[tokio::test]
async fn cache_can_be_cleared() {
    let db = db().await;
    db.insert_cached_match(&record("KR_1")).await.unwrap();
    db.insert_cached_match(&record("KR_2")).await.unwrap();
    // Replacing keeps a single row per match
    db.insert_cached_match(&record("KR_2")).await.unwrap();

    assert_eq!(db.clear_cache().await.unwrap(), 2);
}

#[tokio::test]
async fn only_successful_reviews_count_as_reviewed() {
    let db = db().await;
    db.insert_review(&NewReview {
        match_id: "KR_1",
        status: ReviewStatus::Done,
        failed_stage: None,
        error_kind: None,
        reason: None,
        score: Some(77),
        flagged: false,
    })
    .await
    .unwrap();
    db.insert_review(&NewReview {
        match_id: "KR_2",
        status: ReviewStatus::Failed,
        failed_stage: Some("fetching"),
        error_kind: Some("rate_limited"),
        reason: Some("retry after 10s"),
        score: None,
        flagged: false,
    })
    .await
    .unwrap();

    let ids = ["KR_1", "KR_2", "KR_3"].map(String::from);
    assert_eq!(db.reviewed_match_ids(&ids).await.unwrap(), vec!["KR_1"]);
    assert!(db.reviewed_match_ids(&[]).await.unwrap().is_empty());

    let history = db.get_reviews("KR_2").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "failed");
    assert_eq!(history[0].failed_stage.as_deref(), Some("fetching"));
    assert_eq!(history[0].score, None);
}
