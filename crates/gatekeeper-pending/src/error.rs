use gatekeeper_core::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PendingError {
    #[error("pending action store unavailable: {0}")]
    Backend(String),

    #[error("confirmation id not found or already consumed")]
    NotFound,

    #[error("stored pending action payload was corrupt: {0}")]
    Corrupt(String),
}

impl PendingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PendingError::NotFound => ErrorCode::ConfirmationExpired,
            PendingError::Backend(_) | PendingError::Corrupt(_) => ErrorCode::DatabaseError,
        }
    }
}

pub type Result<T> = std::result::Result<T, PendingError>;
