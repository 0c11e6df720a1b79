use std::sync::Mutex;

use gatekeeper_contract::cursor::RelationalCursor;
use gatekeeper_toolserver::{with_session_scope, SessionScoped, SessionVariableBundle};
use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Employee, SELECT_COLUMNS};

/// Thread-safe manager for the HR backend's single SQLite connection.
///
/// A `Mutex` is sufficient at this scale (mirrors the reference
/// workspace's session store); a connection pool would be the next step
/// for a multi-node deployment.
pub struct HrManager {
    db: Mutex<Connection>,
}

/// The connection plus whatever session variable bundle is currently
/// scoped to it. Exists only to give the connection a `SessionScoped` impl
/// without giving `rusqlite::Connection` one directly.
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
    format!("SELECT {SELECT_COLUMNS} FROM employees {suffix}")
}

impl HrManager {
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
    pub fn list_employees(
        &self,
        bundle: &SessionVariableBundle,
        department: Option<&str>,
        limit: u32,
        cursor: Option<&RelationalCursor>,
    ) -> Result<(Vec<Employee>, bool)> {
        let mut scoped = self.scoped();
        let rows: rusqlite::Result<Vec<Employee>> = with_session_scope(&mut scoped, bundle, |scoped| {
            let conn = &scoped.conn;
            let fetch = limit as i64 + 1;

            match (department, cursor) {
                (Some(dept), Some(c)) => {
                    let mut stmt = conn.prepare(&select(
                        "WHERE department = ?1 AND (last_name, first_name, id) > (?2, ?3, ?4)
                         ORDER BY last_name, first_name, id LIMIT ?5",
                    ))?;
                    stmt.query_map(
                        rusqlite::params![dept, c.primary, c.secondary, c.id, fetch],
                        Employee::from_row,
                    )?
                    .collect()
                }
                (Some(dept), None) => {
                    let mut stmt = conn.prepare(&select(
                        "WHERE department = ?1 ORDER BY last_name, first_name, id LIMIT ?2",
                    ))?;
                    stmt.query_map(rusqlite::params![dept, fetch], Employee::from_row)?
                        .collect()
                }
                (None, Some(c)) => {
                    let mut stmt = conn.prepare(&select(
                        "WHERE (last_name, first_name, id) > (?1, ?2, ?3)
                         ORDER BY last_name, first_name, id LIMIT ?4",
                    ))?;
                    stmt.query_map(
                        rusqlite::params![c.primary, c.secondary, c.id, fetch],
                        Employee::from_row,
                    )?
                    .collect()
                }
                (None, None) => {
                    let mut stmt = conn.prepare(&select("ORDER BY last_name, first_name, id LIMIT ?1"))?;
                    stmt.query_map(rusqlite::params![fetch], Employee::from_row)?.collect()
                }
            }
        });

        rows.map(|mut rows| {
            let has_more = rows.len() > limit as usize;
            rows.truncate(limit as usize);
            (rows, has_more)
        })
        .map_err(Into::into)
    }

    #[instrument(skip(self, bundle))]
    pub fn get_employee(&self, bundle: &SessionVariableBundle, id: &str) -> Result<Option<Employee>> {
        let mut scoped = self.scoped();
        with_session_scope(&mut scoped, bundle, |scoped| {
            match scoped
                .conn
                .query_row(&select("WHERE id = ?1"), [id], Employee::from_row)
            {
                Ok(e) => Ok(Some(e)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .map_err(Into::into)
    }

    /// Applies the approved salary change and writes an audit row, all in
    /// one connection acquisition. Called only from `/execute`.
    #[instrument(skip(self, bundle))]
    pub fn update_salary(&self, bundle: &SessionVariableBundle, id: &str, new_salary: f64) -> Result<u64> {
        let mut scoped = self.scoped();
        with_session_scope(&mut scoped, bundle, |scoped| {
            let now = chrono::Utc::now().to_rfc3339();
            let changed = scoped.conn.execute(
                "UPDATE employees SET salary = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![new_salary, now, id],
            )?;
            if changed > 0 {
                audit(&scoped.conn, bundle, "update_employee_salary", id)?;
            }
            Ok(changed as u64)
        })
        .map_err(Into::into)
    }

    /// Deletes the employee row and writes an audit row. Called only from
    /// `/execute`.
    #[instrument(skip(self, bundle))]
    pub fn delete_employee(&self, bundle: &SessionVariableBundle, id: &str) -> Result<u64> {
        let mut scoped = self.scoped();
        with_session_scope(&mut scoped, bundle, |scoped| {
            let changed = scoped.conn.execute("DELETE FROM employees WHERE id = ?1", [id])?;
            if changed > 0 {
                audit(&scoped.conn, bundle, "delete_employee", id)?;
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

    fn manager() -> HrManager {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        db::seed(&conn).unwrap();
        HrManager::new(conn)
    }

    fn bundle() -> SessionVariableBundle {
        SessionVariableBundle {
            user_id: "u1".into(),
            roles_csv: "hr-read,hr-write".into(),
            email: None,
            department: None,
        }
    }

    #[test]
    fn list_employees_paginates_with_keyset_tiebreaker() {
        let mgr = manager();
        let (page, has_more) = mgr.list_employees(&bundle(), None, 2, None).unwrap();
        assert_eq!(page.len(), 2);
        assert!(has_more);

        let last = page.last().unwrap();
        let cursor = RelationalCursor {
            primary: last.last_name.clone(),
            secondary: last.first_name.clone(),
            id: last.id.clone(),
        };
        let (next_page, _) = mgr.list_employees(&bundle(), None, 2, Some(&cursor)).unwrap();
        assert!(next_page.iter().all(|e| !page.iter().any(|p| p.id == e.id)));
    }

    #[test]
    fn get_employee_returns_none_for_unknown_id() {
        let mgr = manager();
        assert!(mgr.get_employee(&bundle(), "no-such-id").unwrap().is_none());
    }

    #[test]
    fn update_salary_writes_audit_row() {
        let mgr = manager();
        let changed = mgr.update_salary(&bundle(), "e-1001", 200000.0).unwrap();
        assert_eq!(changed, 1);
        let updated = mgr.get_employee(&bundle(), "e-1001").unwrap().unwrap();
        assert_eq!(updated.salary, 200000.0);

        let count: i64 = mgr
            .db
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM audit_log WHERE action = 'update_employee_salary'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn delete_employee_is_idempotent_at_zero_rows() {
        let mgr = manager();
        assert_eq!(mgr.delete_employee(&bundle(), "e-1001").unwrap(), 1);
        assert_eq!(mgr.delete_employee(&bundle(), "e-1001").unwrap(), 0);
    }
}
