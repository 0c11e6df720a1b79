use chrono::Utc;
use gatekeeper_contract::{PendingAction, ToolResponse};
use serde_json::Value;
use uuid::Uuid;

/// Builds a fresh [`PendingAction`] plus the `pendingConfirmation` envelope
/// returned to the Gateway for a destructive tool's first invocation
/// (spec §4.4 "Write tools with confirmation"). The confirmation data
/// always carries the originating user id so `/confirm` can later verify
/// ownership without a second backend lookup.
pub struct ConfirmationBuilder {
    action_tag: String,
    owner: String,
}

impl ConfirmationBuilder {
    pub fn new(action_tag: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            action_tag: action_tag.into(),
            owner: owner.into(),
        }
    }

    /// `message` is the human-readable confirmation prompt (e.g. "Delete
    /// employee Jane Doe?"); `payload` is the action-specific data needed
    /// to perform the mutation once approved.
    pub fn build(&self, originating_user_id: &str, message: impl Into<String>, payload: Value) -> (PendingAction, ToolResponse) {
        let confirmation_id = Uuid::new_v4().to_string();
        let message = message.into();

        let action = PendingAction {
            confirmation_id: confirmation_id.clone(),
            action_tag: self.action_tag.clone(),
            owner: self.owner.clone(),
            originating_user_id: originating_user_id.to_string(),
            created_at: Utc::now(),
            payload,
        };

        let envelope = ToolResponse::pending(confirmation_id, message, Value::Null);

        (action, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_stamps_originating_user_and_action_tag() {
        let builder = ConfirmationBuilder::new("delete_employee", "hr");
        let (action, envelope) = builder.build("u1", "Delete Jane Doe?", json!({"employee_id": "e1"}));

        assert_eq!(action.originating_user_id, "u1");
        assert_eq!(action.action_tag, "delete_employee");
        assert_eq!(action.owner, "hr");
        assert_eq!(action.payload, json!({"employee_id": "e1"}));

        match envelope {
            ToolResponse::PendingConfirmation { confirmation_id, .. } => {
                assert_eq!(confirmation_id, action.confirmation_id);
            }
            other => panic!("expected PendingConfirmation, got {other:?}"),
        }
    }
}
