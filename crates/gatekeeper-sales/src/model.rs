use serde::Serialize;

/// Fields masked unless the caller's role is in the backend's configured
/// unmasked set (spec §4.4 step 7).
pub const SENSITIVE_FIELDS: &[&str] = &["commission_rate"];

#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub id: String,
    pub account_name: String,
    pub owner_user_id: String,
    pub stage: String,
    pub amount: f64,
    pub commission_rate: f64,
    pub created_at: String,
}

impl Deal {
    pub fn is_open(&self) -> bool {
        self.stage != "closed_won" && self.stage != "closed_lost"
    }
}
