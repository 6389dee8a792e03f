//! Pure building blocks of a match review: the validated match model, the
//! performance analysis, the prompt sent to the model and the parsing of its
//! answer. Nothing in here performs I/O.

pub mod analyzer;
pub mod error;
pub mod format;
pub mod label;
pub mod model;
pub mod prompt;
pub mod report;
pub mod review;
pub mod role;
pub mod scoring;

pub use analyzer::MatchAnalyzer;
pub use error::ModelError;
pub use model::{MatchRecord, ParticipantRecord, ParticipantStats, TeamSide};
pub use prompt::{Prompt, PromptGenerator};
pub use report::PerformanceReport;
pub use review::AnalysisResult;
