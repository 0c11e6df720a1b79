use gatekeeper_core::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("malformed bearer token: {0}")]
    Malformed(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("unexpected audience or issuer")]
    WrongAudience,

    #[error("token has been revoked")]
    Revoked,

    #[error("no signing key with kid {0}")]
    UnknownKey(String),

    #[error("unrecognized role claim: {0}")]
    UnknownRole(String),

    #[error("failed to fetch signing keys: {0}")]
    JwksFetch(String),
}

impl IdentityError {
    /// Every variant surfaces to the caller as `UNAUTHORIZED` (spec §4.1) —
    /// the distinction matters only for logs, which log the `Display` text.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Unauthorized
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
