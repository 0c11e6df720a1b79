use gatekeeper_toolserver::ToolServerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupportError {
    #[error(transparent)]
    ToolServer(#[from] ToolServerError),
}

impl SupportError {
    pub fn into_tool_server_error(self) -> ToolServerError {
        match self {
            SupportError::ToolServer(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, SupportError>;
