use rusqlite::Connection;

use crate::error::Result;

/// Initialise the invoices, audit log, and their indexes.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS invoices (
            id              TEXT PRIMARY KEY,
            customer_name   TEXT NOT NULL,
            department      TEXT NOT NULL,
            amount          REAL NOT NULL,
            refunded_amount REAL NOT NULL DEFAULT 0,
            status          TEXT NOT NULL,
            issued_date     TEXT NOT NULL,
            account_number  TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_invoices_dept_keyset
            ON invoices(department, issued_date, created_at, id);

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

/// Seeds a handful of invoices so the reference configuration is usable
/// out of the box. A no-op on any restart — keyed inserts with `OR IGNORE`.
pub fn seed(conn: &Connection) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows: &[(&str, &str, &str, f64, &str, &str, &str)] = &[
        ("inv-2001", "Northwind Traders", "engineering", 48000.0, "paid", "2026-01-15", "acct-884411"),
        ("inv-2002", "Contoso Ltd", "sales", 12500.0, "open", "2026-03-02", "acct-884412"),
        ("inv-2003", "Fabrikam Inc", "engineering", 9800.0, "paid", "2026-03-20", "acct-884413"),
        ("inv-2004", "Globex Corp", "support", 2200.0, "open", "2026-04-01", "acct-884414"),
        ("inv-2005", "Initech", "finance", 76000.0, "void", "2026-04-18", "acct-884415"),
    ];

    for (id, customer, dept, amount, status, issued_date, account_number) in rows {
        conn.execute(
            "INSERT OR IGNORE INTO invoices
             (id, customer_name, department, amount, refunded_amount, status, issued_date, account_number, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![id, customer, dept, amount, status, issued_date, account_number, now],
        )?;
    }
    Ok(())
}
