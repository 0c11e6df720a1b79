use chrono::Utc;
use dashmap::DashMap;
use gatekeeper_contract::PendingAction;

use crate::error::Result;
use crate::store::PendingActionStore;

struct Entry {
    action: PendingAction,
    expires_at: chrono::DateTime<Utc>,
}

/// In-process [`PendingActionStore`] for tests and single-node
/// development, so the confirmation flow can be exercised without a real
/// external-KV dependency running.
#[derive(Default)]
pub struct InMemoryPendingStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PendingActionStore for InMemoryPendingStore {
    async fn put(&self, action: &PendingAction, ttl_secs: u64) -> Result<()> {
        self.entries.insert(
            action.confirmation_id.clone(),
            Entry {
                action: action.clone(),
                expires_at: Utc::now() + chrono::Duration::seconds(ttl_secs as i64),
            },
        );
        Ok(())
    }

    async fn take(&self, confirmation_id: &str) -> Result<Option<PendingAction>> {
        let Some((_, entry)) = self.entries.remove(confirmation_id) else {
            return Ok(None);
        };
        if entry.expires_at <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(entry.action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_action(id: &str) -> PendingAction {
        PendingAction {
            confirmation_id: id.to_string(),
            action_tag: "delete_employee".to_string(),
            owner: "hr".to_string(),
            originating_user_id: "u1".to_string(),
            created_at: Utc::now(),
            payload: json!({"employee_id": "e1"}),
        }
    }

    #[tokio::test]
    async fn put_then_take_returns_action_once() {
        let store = InMemoryPendingStore::new();
        store.put(&sample_action("c1"), 300).await.unwrap();

        let taken = store.take("c1").await.unwrap();
        assert!(taken.is_some());
        assert_eq!(taken.unwrap().confirmation_id, "c1");

        let second = store.take("c1").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn take_on_unknown_id_returns_none() {
        let store = InMemoryPendingStore::new();
        assert!(store.take("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let store = InMemoryPendingStore::new();
        store.put(&sample_action("c2"), 0).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(store.take("c2").await.unwrap().is_none());
    }
}
