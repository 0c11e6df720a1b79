use serde::{Deserialize, Serialize};

use crate::envelope::ToolResponse;

/// The client-facing `/query` SSE event payloads (spec §6.4). Each variant
/// name is also the SSE `event:` field; callers serialize the payload as
/// the `data:` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Connected {
        correlation_id: String,
    },
    Text {
        delta: String,
    },
    Tool {
        name: String,
        envelope: ToolResponse,
    },
    Pending {
        confirmation_id: String,
        message: String,
        data: serde_json::Value,
    },
    Warnings {
        items: Vec<BackendWarning>,
    },
    Error {
        code: String,
        message: String,
    },
    Done {},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendWarning {
    pub server: String,
    pub code: String,
    pub message: String,
}

impl ClientEvent {
    /// The SSE `event:` line name for this variant.
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::Connected { .. } => "connected",
            ClientEvent::Text { .. } => "text",
            ClientEvent::Tool { .. } => "tool",
            ClientEvent::Pending { .. } => "pending",
            ClientEvent::Warnings { .. } => "warnings",
            ClientEvent::Error { .. } => "error",
            ClientEvent::Done {} => "done",
        }
    }

    /// The `data:` field — the payload alone, not the `{event, data}`
    /// wrapper used for internal (de)serialization.
    pub fn data_json(&self) -> serde_json::Value {
        match self {
            ClientEvent::Connected { correlation_id } => {
                serde_json::json!({ "correlationId": correlation_id })
            }
            ClientEvent::Text { delta } => serde_json::json!({ "delta": delta }),
            ClientEvent::Tool { name, envelope } => {
                serde_json::json!({ "name": name, "envelope": envelope })
            }
            ClientEvent::Pending {
                confirmation_id,
                message,
                data,
            } => serde_json::json!({
                "confirmationId": confirmation_id,
                "message": message,
                "data": data,
            }),
            ClientEvent::Warnings { items } => serde_json::json!({ "items": items }),
            ClientEvent::Error { code, message } => {
                serde_json::json!({ "code": code, "message": message })
            }
            ClientEvent::Done {} => serde_json::json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_event_has_empty_object_data() {
        let ev = ClientEvent::Done {};
        assert_eq!(ev.event_name(), "done");
        assert_eq!(ev.data_json(), serde_json::json!({}));
    }

    #[test]
    fn pending_event_never_carries_raw_confirmation_payload_field() {
        // `data` here is the *safe subset* the caller builds, not the full
        // PendingAction.payload — this test documents that distinction so a
        // future caller doesn't accidentally wire the full payload through.
        let ev = ClientEvent::Pending {
            confirmation_id: "c1".into(),
            message: "delete Bob?".into(),
            data: serde_json::json!({"employee_name": "Bob"}),
        };
        let json = ev.data_json();
        assert!(json.get("confirmationId").is_some());
        assert!(json.get("message").is_some());
    }
}
