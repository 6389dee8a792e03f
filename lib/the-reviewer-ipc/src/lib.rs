use serde::{Deserialize, Serialize};

pub mod error;
pub mod r#pub;
pub mod sub;

pub const IPC_REVIEW_PATH: &str = "ipc:///tmp/the-reviewer.ipc";

/// Work item handed from `enqueue` to a running `serve` process.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ReviewRequest {
    /// Review a single match by id.
    Match { match_id: String },
    /// Review the most recent matches of a player, given as `Name#TAG`.
    Summoner { riot_id: String, count: u32 },
}

impl ReviewRequest {
    pub fn describe(&self) -> String {
        match self {
            ReviewRequest::Match { match_id } => format!("match {match_id}"),
            ReviewRequest::Summoner { riot_id, count } => {
                format!("last {count} matches of {riot_id}")
            }
        }
    }
}
