use gatekeeper_toolserver::ToolServerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SalesError {
    #[error(transparent)]
    ToolServer(#[from] ToolServerError),
}

impl SalesError {
    pub fn into_tool_server_error(self) -> ToolServerError {
        match self {
            SalesError::ToolServer(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, SalesError>;
