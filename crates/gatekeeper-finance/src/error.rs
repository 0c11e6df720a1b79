use gatekeeper_toolserver::ToolServerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinanceError {
    #[error(transparent)]
    ToolServer(#[from] ToolServerError),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl FinanceError {
    pub fn into_tool_server_error(self) -> ToolServerError {
        match self {
            FinanceError::ToolServer(e) => e,
            FinanceError::Sqlite(e) => ToolServerError::Database(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinanceError>;
