use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::chrono::NaiveDateTime};
use std::fmt::Display;

#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct CachedMatch {
    pub match_id: String,
    /// JSON of a validated `MatchRecord`
    pub payload: String,
    pub fetch_time: NaiveDateTime,
}

#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub match_id: String,
    pub status: String,
    pub failed_stage: Option<String>,
    pub error_kind: Option<String>,
    pub reason: Option<String>,
    pub score: Option<i64>,
    pub flagged: bool,
    pub create_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Done,
    Failed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Done => "done",
            ReviewStatus::Failed => "failed",
        }
    }
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a pipeline run, as written to the history table.
#[derive(Debug, Clone)]
pub struct NewReview<'a> {
    pub match_id: &'a str,
    pub status: ReviewStatus,
    pub failed_stage: Option<&'a str>,
    pub error_kind: Option<&'a str>,
    pub reason: Option<&'a str>,
    pub score: Option<u8>,
    pub flagged: bool,
}
