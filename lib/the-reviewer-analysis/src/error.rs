use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid match data: {0}")]
    Validation(String),
    #[error("unusable model output: {0}")]
    UnusableOutput(String),
}

impl ModelError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
