use serde::Serialize;

/// Field names tagged sensitive for this backend (spec §4.4 step 7).
pub const SENSITIVE_FIELDS: &[&str] = &["salary", "government_id"];

pub const SELECT_COLUMNS: &str =
    "id, first_name, last_name, department, title, email, salary, government_id, manager_id";

#[derive(Debug, Clone, Serialize)]
pub struct Employee {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub title: String,
    pub email: Option<String>,
    pub salary: f64,
    pub government_id: Option<String>,
    pub manager_id: Option<String>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Column order must match [`SELECT_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            department: row.get(3)?,
            title: row.get(4)?,
            email: row.get(5)?,
            salary: row.get(6)?,
            government_id: row.get(7)?,
            manager_id: row.get(8)?,
        })
    }
}
