use gatekeeper_contract::{ToolDescriptor, ToolKind};
use gatekeeper_core::types::RoleTag;
use serde_json::{json, Value};

pub const OWNER: &str = "finance";

pub fn list_invoices_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "department": {"type": "string"},
            "status": {"type": "string", "enum": ["open", "paid", "void"]},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
            "cursor": {"type": "string"}
        },
        "additionalProperties": false
    })
}

pub fn get_invoice_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "invoice_id": {"type": "string"}
        },
        "required": ["invoice_id"],
        "additionalProperties": false
    })
}

pub fn get_budget_summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

pub fn void_invoice_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "invoice_id": {"type": "string"},
            "reason": {"type": "string", "maxLength": 500}
        },
        "required": ["invoice_id"],
        "additionalProperties": false
    })
}

pub fn issue_refund_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "invoice_id": {"type": "string"},
            "amount": {"type": "number", "exclusiveMinimum": 0},
            "reason": {"type": "string", "maxLength": 500}
        },
        "required": ["invoice_id", "amount"],
        "additionalProperties": false
    })
}

/// Static descriptor list returned by `/tools/discover` (spec §4.4).
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_invoices".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::FinanceRead],
            input_schema: list_invoices_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "get_invoice".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::FinanceRead],
            input_schema: get_invoice_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "get_budget_summary".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::FinanceRead],
            input_schema: get_budget_summary_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "void_invoice".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::FinanceWrite],
            input_schema: void_invoice_schema(),
            output_schema: json!({}),
            kind: ToolKind::Write,
            destructive: true,
        },
        ToolDescriptor {
            name: "issue_refund".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::FinanceWrite],
            input_schema: issue_refund_schema(),
            output_schema: json!({}),
            kind: ToolKind::Write,
            destructive: true,
        },
    ]
}
