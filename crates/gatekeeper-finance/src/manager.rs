use std::sync::Mutex;

use gatekeeper_contract::cursor::RelationalCursor;
use gatekeeper_toolserver::{with_session_scope, SessionScoped, SessionVariableBundle};
use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{BudgetSummary, DepartmentBudget, Invoice, SELECT_COLUMNS};

/// Thread-safe manager for the Finance backend's single SQLite connection.
pub struct FinanceManager {
    db: Mutex<Connection>,
}

struct ScopedConn<'a> {
    conn: std::sync::MutexGuard<'a, Connection>,
    bundle: Option<SessionVariableBundle>,
}

impl<'a> SessionScoped for ScopedConn<'a> {
    fn set_session_vars(&mut self, bundle: &SessionVariableBundle) {
        self.bundle = Some(bundle.clone());
    }

    fn clear_session_vars(&mut self) {
        self.bundle = None;
    }
}

fn select(suffix: &str) -> String {
    format!("SELECT {SELECT_COLUMNS} FROM invoices {suffix}")
}

impl FinanceManager {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    fn scoped(&self) -> ScopedConn<'_> {
        ScopedConn {
            conn: self.db.lock().unwrap(),
            bundle: None,
        }
    }

    #[instrument(skip(self, bundle))]
    pub fn list_invoices(
        &self,
        bundle: &SessionVariableBundle,
        department: Option<&str>,
        status: Option<&str>,
        limit: u32,
        cursor: Option<&RelationalCursor>,
    ) -> Result<(Vec<Invoice>, bool)> {
        let mut scoped = self.scoped();
        let rows: rusqlite::Result<Vec<Invoice>> = with_session_scope(&mut scoped, bundle, |scoped| {
            let conn = &scoped.conn;
            let fetch = limit as i64 + 1;
            const ORDER_LIMIT: &str = "ORDER BY issued_date, created_at, id LIMIT";

            match (department, status, cursor) {
                (Some(d), Some(s), Some(c)) => conn
                    .prepare(&select(&format!(
                        "WHERE department = ?1 AND status = ?2
                         AND (issued_date, created_at, id) > (?3, ?4, ?5)
                         {ORDER_LIMIT} ?6"
                    )))?
                    .query_map(rusqlite::params![d, s, c.primary, c.secondary, c.id, fetch], Invoice::from_row)?
                    .collect(),
                (Some(d), Some(s), None) => conn
                    .prepare(&select(&format!("WHERE department = ?1 AND status = ?2 {ORDER_LIMIT} ?3")))?
                    .query_map(rusqlite::params![d, s, fetch], Invoice::from_row)?
                    .collect(),
                (Some(d), None, Some(c)) => conn
                    .prepare(&select(&format!(
                        "WHERE department = ?1 AND (issued_date, created_at, id) > (?2, ?3, ?4)
                         {ORDER_LIMIT} ?5"
                    )))?
                    .query_map(rusqlite::params![d, c.primary, c.secondary, c.id, fetch], Invoice::from_row)?
                    .collect(),
                (Some(d), None, None) => conn
                    .prepare(&select(&format!("WHERE department = ?1 {ORDER_LIMIT} ?2")))?
                    .query_map(rusqlite::params![d, fetch], Invoice::from_row)?
                    .collect(),
                (None, Some(s), Some(c)) => conn
                    .prepare(&select(&format!(
                        "WHERE status = ?1 AND (issued_date, created_at, id) > (?2, ?3, ?4)
                         {ORDER_LIMIT} ?5"
                    )))?
                    .query_map(rusqlite::params![s, c.primary, c.secondary, c.id, fetch], Invoice::from_row)?
                    .collect(),
                (None, Some(s), None) => conn
                    .prepare(&select(&format!("WHERE status = ?1 {ORDER_LIMIT} ?2")))?
                    .query_map(rusqlite::params![s, fetch], Invoice::from_row)?
                    .collect(),
                (None, None, Some(c)) => conn
                    .prepare(&select(&format!(
                        "WHERE (issued_date, created_at, id) > (?1, ?2, ?3) {ORDER_LIMIT} ?4"
                    )))?
                    .query_map(rusqlite::params![c.primary, c.secondary, c.id, fetch], Invoice::from_row)?
                    .collect(),
                (None, None, None) => conn
                    .prepare(&select(&format!("{ORDER_LIMIT} ?1")))?
                    .query_map(rusqlite::params![fetch], Invoice::from_row)?
                    .collect(),
            }
        });

        rows.map(|mut rows: Vec<Invoice>| {
            let has_more = rows.len() > limit as usize;
            rows.truncate(limit as usize);
            (rows, has_more)
        })
        .map_err(Into::into)
    }

    #[instrument(skip(self, bundle))]
    pub fn get_invoice(&self, bundle: &SessionVariableBundle, id: &str) -> Result<Option<Invoice>> {
        let mut scoped = self.scoped();
        with_session_scope(&mut scoped, bundle, |scoped| {
            match scoped.conn.query_row(&select("WHERE id = ?1"), [id], Invoice::from_row) {
                Ok(inv) => Ok(Some(inv)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .map_err(Into::into)
    }

    #[instrument(skip(self, bundle))]
    pub fn budget_summary(&self, bundle: &SessionVariableBundle) -> Result<BudgetSummary> {
        let mut scoped = self.scoped();
        with_session_scope(&mut scoped, bundle, |scoped| {
            let conn = &scoped.conn;
            let mut stmt = conn.prepare(
                "SELECT department,
                        SUM(amount),
                        SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END),
                        SUM(CASE WHEN status = 'open' THEN amount ELSE 0 END),
                        SUM(refunded_amount)
                 FROM invoices
                 WHERE status != 'void'
                 GROUP BY department
                 ORDER BY department",
            )?;
            let by_department = stmt
                .query_map([], |row| {
                    Ok(DepartmentBudget {
                        department: row.get(0)?,
                        invoiced: row.get(1)?,
                        paid: row.get(2)?,
                        outstanding: row.get(3)?,
                        refunded: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let total_invoiced = by_department.iter().map(|d| d.invoiced).sum();
            let total_paid = by_department.iter().map(|d| d.paid).sum();
            let total_outstanding = by_department.iter().map(|d| d.outstanding).sum();
            let total_refunded = by_department.iter().map(|d| d.refunded).sum();

            Ok(BudgetSummary {
                total_invoiced,
                total_paid,
                total_outstanding,
                total_refunded,
                by_department,
            })
        })
        .map_err(Into::into)
    }

    /// Marks the invoice void. Called only from `/execute`.
    #[instrument(skip(self, bundle))]
    pub fn void_invoice(&self, bundle: &SessionVariableBundle, id: &str) -> Result<u64> {
        let mut scoped = self.scoped();
        with_session_scope(&mut scoped, bundle, |scoped| {
            let now = chrono::Utc::now().to_rfc3339();
            let changed = scoped.conn.execute(
                "UPDATE invoices SET status = 'void', updated_at = ?1 WHERE id = ?2 AND status != 'void'",
                rusqlite::params![now, id],
            )?;
            if changed > 0 {
                audit(&scoped.conn, bundle, "void_invoice", id)?;
            }
            Ok(changed as u64)
        })
        .map_err(Into::into)
    }

    /// Adds `amount` to the invoice's refunded total. Called only from
    /// `/execute`; caps the refund at the invoice's paid amount.
    #[instrument(skip(self, bundle))]
    pub fn issue_refund(&self, bundle: &SessionVariableBundle, id: &str, amount: f64) -> Result<u64> {
        let mut scoped = self.scoped();
        with_session_scope(&mut scoped, bundle, |scoped| {
            let now = chrono::Utc::now().to_rfc3339();
            let changed = scoped.conn.execute(
                "UPDATE invoices
                 SET refunded_amount = refunded_amount + ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'paid' AND refunded_amount + ?1 <= amount",
                rusqlite::params![amount, now, id],
            )?;
            if changed > 0 {
                audit(&scoped.conn, bundle, "issue_refund", id)?;
            }
            Ok(changed as u64)
        })
        .map_err(Into::into)
    }
}

fn audit(conn: &Connection, bundle: &SessionVariableBundle, action: &str, target_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO audit_log (id, actor_user_id, actor_roles, action, target_id, at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            Uuid::new_v4().to_string(),
            bundle.user_id,
            bundle.roles_csv,
            action,
            target_id,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn manager() -> FinanceManager {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        db::seed(&conn).unwrap();
        FinanceManager::new(conn)
    }

    fn bundle() -> SessionVariableBundle {
        SessionVariableBundle {
            user_id: "u1".into(),
            roles_csv: "finance-read,finance-write".into(),
            email: None,
            department: None,
        }
    }

    #[test]
    fn list_invoices_paginates_and_filters_by_department() {
        let mgr = manager();
        let (page, has_more) = mgr
            .list_invoices(&bundle(), Some("engineering"), None, 1, None)
            .unwrap();
        assert_eq!(page.len(), 1);
        assert!(has_more);
        assert!(page.iter().all(|i| i.department == "engineering"));
    }

    #[test]
    fn get_invoice_returns_none_for_unknown_id() {
        let mgr = manager();
        assert!(mgr.get_invoice(&bundle(), "no-such-id").unwrap().is_none());
    }

    #[test]
    fn budget_summary_excludes_void_invoices() {
        let mgr = manager();
        let summary = mgr.budget_summary(&bundle()).unwrap();
        assert!(summary.by_department.iter().all(|d| d.department != "finance"));
    }

    #[test]
    fn void_invoice_is_idempotent() {
        let mgr = manager();
        assert_eq!(mgr.void_invoice(&bundle(), "inv-2002").unwrap(), 1);
        assert_eq!(mgr.void_invoice(&bundle(), "inv-2002").unwrap(), 0);
    }

    #[test]
    fn issue_refund_rejects_amount_exceeding_paid_total() {
        let mgr = manager();
        assert_eq!(mgr.issue_refund(&bundle(), "inv-2001", 1_000_000.0).unwrap(), 0);
        assert_eq!(mgr.issue_refund(&bundle(), "inv-2001", 100.0).unwrap(), 1);
    }
}
