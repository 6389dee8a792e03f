#![allow(dead_code)]

use axum::Router;
use std::fs;
use std::path::PathBuf;
use the_reviewer_analysis::MatchRecord;

/// Serve `router` on a free local port and return its base url.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::task::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

/// A base url nothing listens on.
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}")
}

pub fn ranked_match() -> MatchRecord {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../../lib/the-reviewer-analysis/tests/fixtures/match_kr_ranked.json");
    let body = fs::read_to_string(path).expect("fixture file should be readable");
    MatchRecord::from_riot_json(&body).expect("fixture should parse")
}
