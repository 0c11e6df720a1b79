pub mod confirmation;
pub mod context;
pub mod discover;
pub mod error;
pub mod pagination;
pub mod redact;
pub mod session;
pub mod validate;

pub use confirmation::ConfirmationBuilder;
pub use context::ToolCallerContext;
pub use discover::discover_response;
pub use error::{Result, ToolServerError};
pub use pagination::{build_page_meta, clamp_limit, trim_page};
pub use redact::{redact_fields, redact_rows, HIDDEN_PLACEHOLDER};
pub use session::{with_session_scope, SessionScoped, SessionVariableBundle};
pub use validate::validate_and_parse;
