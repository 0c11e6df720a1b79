use async_trait::async_trait;
use gatekeeper_contract::PendingAction;
use redis::AsyncCommands;

use crate::error::{PendingError, Result};
use crate::store::PendingActionStore;

const KEY_PREFIX: &str = "gatekeeper:pending:";

/// Redis-backed [`PendingActionStore`]. `put` is a `SET ... EX` so expiry
/// is enforced by the store itself, not by a background sweep; `take` is a
/// single Lua script doing `GET` then `DEL` so two concurrent `/confirm`
/// calls for the same id can't both succeed.
pub struct RedisPendingStore {
    client: redis::Client,
}

impl RedisPendingStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client =
            redis::Client::open(redis_url).map_err(|e| PendingError::Backend(e.to_string()))?;
        Ok(Self { client })
    }

    fn key(confirmation_id: &str) -> String {
        format!("{KEY_PREFIX}{confirmation_id}")
    }
}

#[async_trait]
impl PendingActionStore for RedisPendingStore {
    async fn put(&self, action: &PendingAction, ttl_secs: u64) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PendingError::Backend(e.to_string()))?;
        let payload =
            serde_json::to_string(action).map_err(|e| PendingError::Corrupt(e.to_string()))?;
        let _: () = conn
            .set_ex(Self::key(&action.confirmation_id), payload, ttl_secs)
            .await
            .map_err(|e| PendingError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn take(&self, confirmation_id: &str) -> Result<Option<PendingAction>> {
        const SCRIPT: &str = r#"
            local v = redis.call("GET", KEYS[1])
            if v then redis.call("DEL", KEYS[1]) end
            return v
        "#;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PendingError::Backend(e.to_string()))?;
        let raw: Option<String> = redis::Script::new(SCRIPT)
            .key(Self::key(confirmation_id))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| PendingError::Backend(e.to_string()))?;

        match raw {
            None => Ok(None),
            Some(s) => {
                let action = serde_json::from_str(&s).map_err(|e| PendingError::Corrupt(e.to_string()))?;
                Ok(Some(action))
            }
        }
    }
}
