use gatekeeper_core::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolServerError {
    #[error("caller context missing or inconsistent: {0}")]
    InvalidContext(String),

    #[error("argument validation failed at {path}: {message}")]
    Validation { path: String, message: String },

    #[error("caller lacks a required role for this tool")]
    InsufficientPermissions,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("pagination cursor invalid: {0}")]
    InvalidCursor(String),

    #[error("backend operation failed: {0}")]
    Database(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("confirmation was not issued to this caller")]
    UserMismatch,
}

impl ToolServerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ToolServerError::InvalidContext(_) => ErrorCode::InvalidContext,
            ToolServerError::Validation { .. } => ErrorCode::ValidationError,
            ToolServerError::InsufficientPermissions => ErrorCode::InsufficientPermissions,
            ToolServerError::NotFound(_) => ErrorCode::NotFound,
            ToolServerError::InvalidCursor(_) => ErrorCode::InvalidCursor,
            ToolServerError::Database(_) => ErrorCode::DatabaseError,
            ToolServerError::OperationFailed(_) => ErrorCode::OperationFailed,
            ToolServerError::UserMismatch => ErrorCode::UserMismatch,
        }
    }

    /// A user-facing message safe to place in the envelope's `message`
    /// field (never includes raw backend error text — that goes in
    /// `technicalDetails` instead, via the caller).
    pub fn public_message(&self) -> String {
        match self {
            ToolServerError::InvalidContext(m) => format!("invalid request context: {m}"),
            ToolServerError::Validation { path, message } => format!("{path}: {message}"),
            ToolServerError::InsufficientPermissions => {
                "you do not have permission to use this tool".to_string()
            }
            ToolServerError::NotFound(m) => m.clone(),
            ToolServerError::InvalidCursor(_) => "the pagination cursor is invalid or stale".to_string(),
            ToolServerError::Database(_) => "a backend error occurred".to_string(),
            ToolServerError::OperationFailed(m) => m.clone(),
            ToolServerError::UserMismatch => {
                "this confirmation was not issued to the requesting caller".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolServerError>;
