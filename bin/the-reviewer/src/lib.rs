//! Post-game reviews of League of Legends matches: fetch the match from the Riot
//! API, score every player, ask a chat model for a review and post it to a chat
//! webhook.

pub mod ai;
pub mod config;
pub mod error;
pub mod handler;
pub mod notify;
pub mod pipeline;
pub mod riot_api;

pub use error::{ErrorKind, ReviewError};
pub use pipeline::{Orchestrator, RunOutcome, Stage};
