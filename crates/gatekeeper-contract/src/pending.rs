use serde::{Deserialize, Serialize};

/// The persisted form of a `pendingConfirmation` envelope (spec §3).
/// Created by the Gateway when a Tool Server returns a pending envelope,
/// stored under `pending:{confirmation_id}` with a 5-minute TTL, and
/// deleted on approval-execution or deny.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub confirmation_id: String,
    /// e.g. `delete_employee` — the tool name that produced this envelope.
    pub action_tag: String,
    /// The Tool Server to re-invoke on `/execute`.
    pub owner: String,
    /// The caller who originated the action; `/confirm` must match this.
    pub originating_user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Opaque to the Gateway — whatever the Tool Server needs to execute.
    pub payload: serde_json::Value,
}

/// The subset of a pending envelope safe to show the LLM/client — never the
/// full confirmation payload (spec §4.1 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPublicView {
    pub confirmation_id: String,
    pub message: String,
}
