use gatekeeper_contract::{ToolDescriptor, ToolKind};
use gatekeeper_core::types::RoleTag;
use serde_json::{json, Value};

pub const OWNER: &str = "support";

pub fn search_tickets_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string"},
            "status": {"type": "string", "enum": ["open", "closed"]},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
            "cursor": {"type": "string"}
        },
        "additionalProperties": false
    })
}

pub fn get_ticket_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticket_id": {"type": "string"}
        },
        "required": ["ticket_id"],
        "additionalProperties": false
    })
}

pub fn close_ticket_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticket_id": {"type": "string"},
            "reason": {"type": "string", "maxLength": 500}
        },
        "required": ["ticket_id"],
        "additionalProperties": false
    })
}

/// Static descriptor list returned by `/tools/discover` (spec §4.4).
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "search_tickets".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::SupportRead],
            input_schema: search_tickets_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "get_ticket".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::SupportRead],
            input_schema: get_ticket_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "close_ticket".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::SupportWrite],
            input_schema: close_ticket_schema(),
            output_schema: json!({}),
            kind: ToolKind::Write,
            destructive: true,
        },
    ]
}
