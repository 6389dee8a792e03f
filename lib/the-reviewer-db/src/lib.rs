use chrono::{TimeDelta, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteQueryResult};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use the_reviewer_analysis::MatchRecord;
use tracing::debug;

// Re-export so that clients can avoid having sqlx as a dependency
pub use sqlx::sqlite::SqlitePoolOptions;

pub mod error;
pub mod model;

pub use error::Error;

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS match_cache (
        match_id TEXT PRIMARY KEY NOT NULL,
        payload TEXT NOT NULL,
        fetch_time DATETIME NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS review (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        match_id TEXT NOT NULL,
        status TEXT NOT NULL,
        failed_stage TEXT,
        error_kind TEXT,
        reason TEXT,
        score INTEGER,
        flagged BOOLEAN NOT NULL DEFAULT FALSE,
        create_time DATETIME NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS review_match_id ON review (match_id)",
];

/// Wrapper around the match cache and the review history. Neither is needed for
/// a review to run, they only save API calls and repeated reports.
#[derive(Debug)]
pub struct DbHandler {
    pool: Pool<Sqlite>,
}

impl DbHandler {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating the file if needed) the database at `url` and make sure the
    /// schema exists.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let handler = Self::new(pool);
        handler.migrate().await?;
        Ok(handler)
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Get a cached match if it was stored less than `ttl` ago. Stale entries are
    /// removed on the way.
    pub async fn get_cached_match(
        &self,
        match_id: &str,
        ttl: Duration,
    ) -> Result<Option<MatchRecord>, Error> {
        let cached = sqlx::query_as::<_, model::CachedMatch>(
            "SELECT * FROM match_cache WHERE match_id = ?",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(cached) = cached else {
            return Ok(None);
        };

        let ttl = TimeDelta::from_std(ttl).map_err(|_| Error::DateTimeOutOfRange)?;
        if Utc::now().naive_utc() - cached.fetch_time >= ttl {
            debug!("Cache entry for {match_id} expired");
            self.remove_cached_match(match_id).await?;
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&cached.payload)?))
    }

    /// Insert or replace the cached copy of a match.
    pub async fn insert_cached_match(
        &self,
        record: &MatchRecord,
    ) -> Result<SqliteQueryResult, Error> {
        let now = Utc::now().naive_utc();
        let payload = serde_json::to_string(record)?;
        Ok(sqlx::query(
            "INSERT OR REPLACE INTO match_cache (match_id, payload, fetch_time) VALUES (?, ?, ?)",
        )
        .bind(record.match_id.as_str())
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await?)
    }

    /// Returns whether an entry was removed.
    pub async fn remove_cached_match(&self, match_id: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM match_cache WHERE match_id = ?")
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop every cached match, returning how many were removed.
    pub async fn clear_cache(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM match_cache")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Record the outcome of a pipeline run.
    pub async fn insert_review(
        &self,
        review: &model::NewReview<'_>,
    ) -> Result<SqliteQueryResult, Error> {
        let now = Utc::now().naive_utc();
        Ok(sqlx::query(
            "INSERT INTO review (match_id, status, failed_stage, error_kind, reason, score, flagged, create_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(review.match_id)
        .bind(review.status.as_str())
        .bind(review.failed_stage)
        .bind(review.error_kind)
        .bind(review.reason)
        .bind(review.score.map(i64::from))
        .bind(review.flagged)
        .bind(now)
        .execute(&self.pool)
        .await?)
    }

    /// Get every recorded run of a match, oldest first.
    pub async fn get_reviews(&self, match_id: &str) -> Result<Vec<model::Review>, Error> {
        Ok(sqlx::query_as::<_, model::Review>(
            "SELECT * FROM review WHERE match_id = ? ORDER BY id ASC",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Filter `match_ids` down to the ones that already have a successful review.
    pub async fn reviewed_match_ids(&self, match_ids: &[String]) -> Result<Vec<String>, Error> {
        if match_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT DISTINCT match_id FROM review WHERE status = 'done' AND match_id IN (",
        );
        let mut ids = query.separated(", ");
        for match_id in match_ids {
            ids.push_bind(match_id.as_str());
        }
        ids.push_unseparated(")");

        Ok(query
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?)
    }
}
