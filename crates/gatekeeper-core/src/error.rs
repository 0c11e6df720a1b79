use thiserror::Error;

/// Closed set of error codes carried in `error` envelopes and logged
/// alongside correlation ids. Every crate's error type maps into one of
/// these via `code()`, so the Gateway can convert any downstream failure
/// into a client-visible envelope with a single exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    InsufficientPermissions,
    InvalidContext,
    ValidationError,
    NotFound,
    InvalidCursor,
    Timeout,
    UpstreamError,
    ProtocolViolation,
    ConfirmationExpired,
    UserMismatch,
    RequestTimeout,
    RateLimited,
    DatabaseError,
    OperationFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::InvalidContext => "INVALID_CONTEXT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidCursor => "INVALID_CURSOR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::ProtocolViolation => "PROTOCOL_VIOLATION",
            ErrorCode::ConfirmationExpired => "CONFIRMATION_EXPIRED",
            ErrorCode::UserMismatch => "USER_MISMATCH",
            ErrorCode::RequestTimeout => "REQUEST_TIMEOUT",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::OperationFailed => "OPERATION_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Config(_) => ErrorCode::OperationFailed,
            CoreError::Internal(_) => ErrorCode::OperationFailed,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
