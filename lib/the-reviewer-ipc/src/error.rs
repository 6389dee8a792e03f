use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("review request could not be encoded or decoded: {0}")]
    Codec(#[from] bincode::Error),
    #[error("socket task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("socket error: {0}")]
    Socket(#[from] nng::Error),
    #[error("socket is closed")]
    Closed,
}
