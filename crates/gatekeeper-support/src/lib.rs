pub mod error;
pub mod handlers;
pub mod model;
pub mod router;
pub mod schema;
pub mod state;
pub mod store;

pub use state::AppState;
pub use store::TicketIndex;
