use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),
    #[error(transparent)]
    SerializationError(#[from] serde_json::Error),
    #[error("time is out of range")]
    DateTimeOutOfRange,
}
