use serde::Serialize;

/// Fields masked unless the caller's role is in the backend's configured
/// unmasked set (spec §4.4 step 7).
pub const SENSITIVE_FIELDS: &[&str] = &["customer_email"];

#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub priority: String,
    pub customer_email: String,
    pub created_at: String,
}
