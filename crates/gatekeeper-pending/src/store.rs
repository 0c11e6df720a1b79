use async_trait::async_trait;
use gatekeeper_contract::PendingAction;

use crate::error::Result;

/// Backing store for two-phase confirmation state (spec §4.6). `put` and
/// `take` must each be atomic at the backend: `take` is a fetch-and-delete
/// so a confirmation id can be redeemed exactly once even under concurrent
/// `/confirm` calls.
#[async_trait]
pub trait PendingActionStore: Send + Sync {
    async fn put(&self, action: &PendingAction, ttl_secs: u64) -> Result<()>;

    /// Removes and returns the action if present and unexpired. `Ok(None)`
    /// means the id was never issued, already redeemed, or has expired.
    async fn take(&self, confirmation_id: &str) -> Result<Option<PendingAction>>;
}
