use gatekeeper_core::types::RoleTag;
use http::HeaderMap;

use crate::error::{Result, ToolServerError};

pub const HEADER_USER_ID: &str = "x-caller-id";
pub const HEADER_ROLES: &str = "x-caller-roles";
pub const HEADER_EMAIL: &str = "x-caller-email";
pub const HEADER_DEPARTMENT: &str = "x-caller-department";

/// The caller identity as it arrives at a Tool Server — headers set by the
/// Gateway on every forwarded call (spec §4.1 "Tool invocation"), not the
/// full `CallerContext` (no token id or timestamps cross this boundary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallerContext {
    pub user_id: String,
    pub roles: Vec<RoleTag>,
    pub email: Option<String>,
    pub department: Option<String>,
}

impl ToolCallerContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let user_id = header_str(headers, HEADER_USER_ID)
            .ok_or_else(|| ToolServerError::InvalidContext("missing caller id header".into()))?
            .to_string();
        if user_id.trim().is_empty() {
            return Err(ToolServerError::InvalidContext("empty caller id".into()));
        }

        let roles_raw = header_str(headers, HEADER_ROLES).unwrap_or("");
        let roles = roles_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<RoleTag>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(ToolServerError::InvalidContext)?;

        let email = header_str(headers, HEADER_EMAIL).map(str::to_string);
        let department = header_str(headers, HEADER_DEPARTMENT).map(str::to_string);

        Ok(Self {
            user_id,
            roles,
            email,
            department,
        })
    }

    pub fn has_any_role(&self, required: &[RoleTag]) -> bool {
        self.roles.iter().any(|r| required.contains(r))
    }

    /// True if `role` is satisfied directly, or implicitly via `executive`
    /// when `role` is a read tag — mirrors
    /// `gatekeeper_core::CallerContext::satisfies_read`.
    pub fn satisfies_read(&self, role: RoleTag) -> bool {
        if self.roles.contains(&role) {
            return true;
        }
        self.roles.contains(&RoleTag::Executive) && RoleTag::READ_TAGS.contains(&role)
    }

    /// The comma-joined role list attached to the backend connection as
    /// the session variable bundle (spec §3, §4.4 step 4).
    pub fn roles_csv(&self) -> String {
        self.roles
            .iter()
            .map(RoleTag::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(
                http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        h
    }

    #[test]
    fn missing_user_id_is_invalid_context() {
        let h = headers(&[(HEADER_ROLES, "hr-read")]);
        assert!(ToolCallerContext::from_headers(&h).is_err());
    }

    #[test]
    fn parses_roles_and_trims_whitespace() {
        let h = headers(&[
            (HEADER_USER_ID, "u1"),
            (HEADER_ROLES, "hr-read, hr-write"),
        ]);
        let ctx = ToolCallerContext::from_headers(&h).unwrap();
        assert_eq!(ctx.roles, vec![RoleTag::HrRead, RoleTag::HrWrite]);
    }

    #[test]
    fn executive_satisfies_read_roles_implicitly() {
        let h = headers(&[(HEADER_USER_ID, "u1"), (HEADER_ROLES, "executive")]);
        let ctx = ToolCallerContext::from_headers(&h).unwrap();
        assert!(ctx.satisfies_read(RoleTag::FinanceRead));
        assert!(!ctx.has_any_role(&[RoleTag::FinanceWrite]));
    }
}
