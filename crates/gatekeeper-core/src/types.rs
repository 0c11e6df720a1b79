use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed role vocabulary accepted in caller claims and tool role
/// requirements (spec §6.1). A role tag that doesn't parse is a malformed
/// credential, not a silently-dropped string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleTag {
    HrRead,
    HrWrite,
    FinanceRead,
    FinanceWrite,
    SalesRead,
    SalesWrite,
    SupportRead,
    SupportWrite,
    Manager,
    Executive,
}

impl RoleTag {
    /// The `*-read` tags the `executive` role implicitly grants.
    pub const READ_TAGS: &'static [RoleTag] = &[
        RoleTag::HrRead,
        RoleTag::FinanceRead,
        RoleTag::SalesRead,
        RoleTag::SupportRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::HrRead => "hr-read",
            RoleTag::HrWrite => "hr-write",
            RoleTag::FinanceRead => "finance-read",
            RoleTag::FinanceWrite => "finance-write",
            RoleTag::SalesRead => "sales-read",
            RoleTag::SalesWrite => "sales-write",
            RoleTag::SupportRead => "support-read",
            RoleTag::SupportWrite => "support-write",
            RoleTag::Manager => "manager",
            RoleTag::Executive => "executive",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoleTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hr-read" => Ok(RoleTag::HrRead),
            "hr-write" => Ok(RoleTag::HrWrite),
            "finance-read" => Ok(RoleTag::FinanceRead),
            "finance-write" => Ok(RoleTag::FinanceWrite),
            "sales-read" => Ok(RoleTag::SalesRead),
            "sales-write" => Ok(RoleTag::SalesWrite),
            "support-read" => Ok(RoleTag::SupportRead),
            "support-write" => Ok(RoleTag::SupportWrite),
            "manager" => Ok(RoleTag::Manager),
            "executive" => Ok(RoleTag::Executive),
            other => Err(format!("unknown role tag: {other}")),
        }
    }
}

/// The authenticated identity accompanying a request, propagated by value
/// to every downstream call (spec §3). Immutable once constructed — there
/// is deliberately no interior mutability here; a CallerContext threaded
/// through a request is always the same value that was built at entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Stable, opaque user identifier from the `sub` claim.
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub roles: Vec<RoleTag>,
    pub department: Option<String>,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    /// Unique per issuance; the revocation set is keyed on this.
    pub token_id: String,
}

impl CallerContext {
    pub fn has_role(&self, role: RoleTag) -> bool {
        self.roles.contains(&role)
    }

    /// True if `role` is satisfied directly, or implicitly via the
    /// `executive` super-role for read tags (spec §4.1).
    pub fn satisfies_read(&self, role: RoleTag) -> bool {
        if self.has_role(role) {
            return true;
        }
        self.has_role(RoleTag::Executive) && RoleTag::READ_TAGS.contains(&role)
    }

    /// Roles serialized as a comma-joined list for the session variable
    /// bundle (spec §3, §4.4).
    pub fn roles_csv(&self) -> String {
        self.roles
            .iter()
            .map(RoleTag::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}
