use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single pipeline component. Which of these end a run is decided by
/// the orchestrator alone.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited by provider{}", .retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    RateLimited,
    TransportError,
    InvalidResponse,
    QuotaExceeded,
    DeliveryFailed,
    ValidationError,
    ServiceUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::DeliveryFailed => "delivery_failed",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::ServiceUnavailable => "service_unavailable",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::NotFound(_) => ErrorKind::NotFound,
            ReviewError::RateLimited { .. } => ErrorKind::RateLimited,
            ReviewError::TransportError(_) => ErrorKind::TransportError,
            ReviewError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            ReviewError::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            ReviewError::DeliveryFailed(_) => ErrorKind::DeliveryFailed,
            ReviewError::ValidationError(_) => ErrorKind::ValidationError,
            ReviewError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
        }
    }
}
