pub mod cursor;
pub mod descriptor;
pub mod envelope;
pub mod pending;
pub mod stream_event;

pub use cursor::{decode_cursor, encode_cursor, CursorError};
pub use descriptor::{DiscoverResponse, ToolDescriptor, ToolKind};
pub use envelope::{PageMeta, ToolResponse};
pub use pending::{PendingAction, PendingPublicView};
pub use stream_event::{BackendWarning, ClientEvent};
