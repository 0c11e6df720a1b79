use serde::Serialize;

/// Fields masked unless the caller's role is in the backend's configured
/// unmasked set (spec §4.4 step 7).
pub const SENSITIVE_FIELDS: &[&str] = &["account_number"];

pub const SELECT_COLUMNS: &str =
    "id, customer_name, department, amount, refunded_amount, status, issued_date, account_number, created_at";

#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: String,
    pub customer_name: String,
    pub department: String,
    pub amount: f64,
    pub refunded_amount: f64,
    pub status: String,
    pub issued_date: String,
    pub account_number: String,
    /// The keyset pagination tie-breaker's secondary column. Internal —
    /// not part of the tool's public response shape.
    #[serde(skip)]
    pub created_at: String,
}

impl Invoice {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customer_name: row.get(1)?,
            department: row.get(2)?,
            amount: row.get(3)?,
            refunded_amount: row.get(4)?,
            status: row.get(5)?,
            issued_date: row.get(6)?,
            account_number: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

/// Aggregate view behind `get_budget_summary`. No pagination — a single
/// snapshot, same as the reference configuration's reporting tool.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentBudget {
    pub department: String,
    pub invoiced: f64,
    pub paid: f64,
    pub outstanding: f64,
    pub refunded: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
    pub total_refunded: f64,
    pub by_department: Vec<DepartmentBudget>,
}
