use gatekeeper_contract::{ToolDescriptor, ToolKind};
use gatekeeper_core::types::RoleTag;
use serde_json::{json, Value};

pub const OWNER: &str = "hr";

pub fn list_employees_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "department": {"type": "string"},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
            "cursor": {"type": "string"}
        },
        "additionalProperties": false
    })
}

pub fn get_employee_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "employee_id": {"type": "string"}
        },
        "required": ["employee_id"],
        "additionalProperties": false
    })
}

pub fn update_employee_salary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "employee_id": {"type": "string"},
            "new_salary": {"type": "number", "exclusiveMinimum": 0},
            "reason": {"type": "string", "maxLength": 500}
        },
        "required": ["employee_id", "new_salary"],
        "additionalProperties": false
    })
}

pub fn delete_employee_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "employee_id": {"type": "string"},
            "reason": {"type": "string", "maxLength": 500}
        },
        "required": ["employee_id"],
        "additionalProperties": false
    })
}

/// Static descriptor list returned by `/tools/discover` (spec §4.4).
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_employees".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::HrRead],
            input_schema: list_employees_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "get_employee".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::HrRead],
            input_schema: get_employee_schema(),
            output_schema: json!({}),
            kind: ToolKind::Read,
            destructive: false,
        },
        ToolDescriptor {
            name: "update_employee_salary".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::HrWrite],
            input_schema: update_employee_salary_schema(),
            output_schema: json!({}),
            kind: ToolKind::Write,
            destructive: true,
        },
        ToolDescriptor {
            name: "delete_employee".into(),
            owner: OWNER.into(),
            required_roles: vec![RoleTag::HrWrite],
            input_schema: delete_employee_schema(),
            output_schema: json!({}),
            kind: ToolKind::Write,
            destructive: true,
        },
    ]
}
