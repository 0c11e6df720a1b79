use rusqlite::Connection;

use crate::error::Result;

/// Initialise the employees, audit log, and their indexes.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS employees (
            id            TEXT PRIMARY KEY,
            first_name    TEXT NOT NULL,
            last_name     TEXT NOT NULL,
            department    TEXT NOT NULL,
            title         TEXT NOT NULL,
            email         TEXT,
            salary        REAL NOT NULL,
            government_id TEXT,
            manager_id    TEXT,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_employees_dept_keyset
            ON employees(department, last_name, first_name, id);

        CREATE TABLE IF NOT EXISTS audit_log (
            id             TEXT PRIMARY KEY,
            actor_user_id  TEXT NOT NULL,
            actor_roles    TEXT NOT NULL,
            action         TEXT NOT NULL,
            target_id      TEXT NOT NULL,
            at             TEXT NOT NULL
        );",
    )?;
    Ok(())
}

/// Seeds a handful of employees so the reference configuration is usable
/// out of the box. A no-op on any restart — keyed inserts with `OR IGNORE`.
pub fn seed(conn: &Connection) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows: &[(&str, &str, &str, &str, &str, &str, f64, &str, Option<&str>)] = &[
        ("e-1001", "Jane", "Doe", "engineering", "Staff Engineer", "jane.doe@example.com", 185000.0, "555-11-2222", None),
        ("e-1002", "Bob", "Nguyen", "engineering", "Engineering Manager", "bob.nguyen@example.com", 210000.0, "555-22-3333", Some("e-1001")),
        ("e-1003", "Aisha", "Khan", "sales", "Account Executive", "aisha.khan@example.com", 120000.0, "555-33-4444", None),
        ("e-1004", "Carlos", "Mendez", "finance", "Controller", "carlos.mendez@example.com", 160000.0, "555-44-5555", None),
        ("e-1005", "Priya", "Shah", "support", "Support Lead", "priya.shah@example.com", 105000.0, "555-55-6666", None),
    ];

    for (id, first, last, dept, title, email, salary, gov_id, manager_id) in rows {
        conn.execute(
            "INSERT OR IGNORE INTO employees
             (id, first_name, last_name, department, title, email, salary, government_id, manager_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            rusqlite::params![id, first, last, dept, title, email, salary, gov_id, manager_id, now],
        )?;
    }
    Ok(())
}
