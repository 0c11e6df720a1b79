pub mod error;
pub mod memory_store;
pub mod redis_store;
pub mod store;

pub use error::{PendingError, Result};
pub use memory_store::InMemoryPendingStore;
pub use redis_store::RedisPendingStore;
pub use store::PendingActionStore;
