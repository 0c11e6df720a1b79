use gatekeeper_toolserver::ToolServerError;
use thiserror::Error;

/// Wraps the shared Tool Server error vocabulary with the one failure mode
/// specific to this backend: a raw SQLite error that hasn't yet been
/// classified into a `ToolServerError` variant.
#[derive(Debug, Error)]
pub enum HrError {
    #[error(transparent)]
    ToolServer(#[from] ToolServerError),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl HrError {
    pub fn into_tool_server_error(self) -> ToolServerError {
        match self {
            HrError::ToolServer(e) => e,
            HrError::Sqlite(e) => ToolServerError::Database(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, HrError>;
