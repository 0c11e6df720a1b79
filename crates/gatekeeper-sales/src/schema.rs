use gatekeeper_contract::{ToolDescriptor, ToolKind};
use gatekeeper_core::types::RoleTag;
use serde_json::{json, Value};

pub const OWNER: &str = "sales";

pub fn list_deals_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "stage": {"type": "string"},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
            "cursor": {"type": "string"}
        },
        "additionalProperties": false
    })
}

pub fn get_deal_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "deal_id": {"type": "string"}
        },
        "required": ["deal_id"],
        "additionalProperties": false
    })
}

pub fn close_deal_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "deal_id": {"type": "string"},
            "reason": {"type": "string", "maxLength": 500}
        },
        "required": ["deal_id"],
        "additionalProperties": false
    })
}

pub fn delete_deal_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "deal_id": {"type": "string"},
            "reason": {"type": "string", "maxLength": 500}
        },
        "required": ["deal_id"],
        "additionalProperties": false
    })
}

/// Static descriptor list returned by `/tools/discover` (spec §4.4).
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_deals".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::SalesRead],
            input_schema: list_deals_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "get_deal".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::SalesRead],
            input_schema: get_deal_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "close_deal".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::SalesWrite],
            input_schema: close_deal_schema(),
            output_schema: json!({}),
            kind: ToolKind::Write,
            destructive: true,
        },
        ToolDescriptor {
            name: "delete_deal".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::SalesWrite],
            input_schema: delete_deal_schema(),
            output_schema: json!({}),
            kind: ToolKind::Write,
            destructive: true,
        },
    ]
}
