use serde::{Deserialize, Serialize};

use gatekeeper_core::types::RoleTag;

/// A tool's shape, as returned by a Tool Server's `/tools/discover` and
/// registered by the Gateway at startup (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique across the whole system.
    pub name: String,
    /// The Tool Server identifier that owns this tool (matches a
    /// `tool_servers[]` entry's `name`).
    pub owner: String,
    /// Disjunctive — any one role in this list suffices.
    pub required_roles: Vec<RoleTag>,
    pub input_schema: serde_json::Value,
    pub output_schema: serde_json::Value,
    pub kind: ToolKind,
    pub destructive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Read,
    Write,
}

impl ToolDescriptor {
    /// The allow-list test from spec §4.1: the caller may invoke this tool
    /// iff the intersection of their roles with `required_roles` is
    /// non-empty, with `executive` implicitly satisfying any read tag.
    pub fn callable_by(&self, caller_roles: &[RoleTag]) -> bool {
        self.required_roles.iter().any(|required| {
            caller_roles.contains(required)
                || (self.kind == ToolKind::Read
                    && caller_roles.contains(&RoleTag::Executive)
                    && RoleTag::READ_TAGS.contains(required))
        })
    }
}

/// Response body for `POST /tools/discover`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscoverResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(roles: &[RoleTag], kind: ToolKind) -> ToolDescriptor {
        ToolDescriptor {
            name: "list_employees".into(),
            owner: "hr".into(),
            required_roles: roles.to_vec(),
            input_schema: serde_json::json!({}),
            output_schema: serde_json::json!({}),
            kind,
            destructive: false,
        }
    }

    #[test]
    fn plain_role_match_allows_call() {
        let t = tool(&[RoleTag::HrRead], ToolKind::Read);
        assert!(t.callable_by(&[RoleTag::HrRead]));
    }

    #[test]
    fn disjoint_roles_deny_call() {
        let t = tool(&[RoleTag::HrRead], ToolKind::Read);
        assert!(!t.callable_by(&[RoleTag::FinanceRead]));
    }

    #[test]
    fn executive_implicitly_grants_read_tools() {
        let t = tool(&[RoleTag::HrRead], ToolKind::Read);
        assert!(t.callable_by(&[RoleTag::Executive]));
    }

    #[test]
    fn executive_does_not_grant_write_tools() {
        let t = tool(&[RoleTag::HrWrite], ToolKind::Write);
        assert!(!t.callable_by(&[RoleTag::Executive]));
    }
}
