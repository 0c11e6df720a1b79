/// The per-query identity attached to a backend connection so row-level
/// access policies can evaluate it (spec §3, glossary "Session variable
/// bundle"). Scope is a single backend statement or transaction — never
/// longer.
#[derive(Debug, Clone)]
pub struct SessionVariableBundle {
    pub user_id: String,
    pub roles_csv: String,
    pub email: Option<String>,
    pub department: Option<String>,
}

impl SessionVariableBundle {
    pub fn from_caller(ctx: &crate::context::ToolCallerContext) -> Self {
        Self {
            user_id: ctx.user_id.clone(),
            roles_csv: ctx.roles_csv(),
            email: ctx.email.clone(),
            department: ctx.department.clone(),
        }
    }
}

/// Implemented by a backend connection type that can carry session
/// variables. `set` runs at scope entry, `clear` runs unconditionally at
/// scope exit (including on panic, via the `Drop` guard in
/// [`with_session_scope`]) so a pooled connection never carries a prior
/// request's identity into the next one (spec §5's shared-resource
/// policy).
pub trait SessionScoped {
    fn set_session_vars(&mut self, bundle: &SessionVariableBundle);
    fn clear_session_vars(&mut self);
}

struct ClearGuard<'a, C: SessionScoped> {
    conn: &'a mut C,
}

impl<'a, C: SessionScoped> Drop for ClearGuard<'a, C> {
    fn drop(&mut self) {
        self.conn.clear_session_vars();
    }
}

/// Runs `f` with `bundle` set on `conn`, guaranteeing the variables are
/// cleared before this function returns — normally or via panic — so the
/// connection is safe to return to a pool. This is the only place the
/// session variable bundle is allowed to touch a connection; callers
/// must not set it directly.
pub fn with_session_scope<C: SessionScoped, R>(
    conn: &mut C,
    bundle: &SessionVariableBundle,
    f: impl FnOnce(&mut C) -> R,
) -> R {
    conn.set_session_vars(bundle);
    let mut guard = ClearGuard { conn };
    f(&mut *guard.conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeConn {
        current_user: Option<String>,
        set_count: u32,
        clear_count: u32,
    }

    impl SessionScoped for FakeConn {
        fn set_session_vars(&mut self, bundle: &SessionVariableBundle) {
            self.current_user = Some(bundle.user_id.clone());
            self.set_count += 1;
        }

        fn clear_session_vars(&mut self) {
            self.current_user = None;
            self.clear_count += 1;
        }
    }

    #[test]
    fn scope_sets_then_clears_even_on_normal_return() {
        let mut conn = FakeConn::default();
        let bundle = SessionVariableBundle {
            user_id: "u1".into(),
            roles_csv: "hr-read".into(),
            email: None,
            department: None,
        };

        let seen_user = with_session_scope(&mut conn, &bundle, |c| c.current_user.clone());

        assert_eq!(seen_user.as_deref(), Some("u1"));
        assert_eq!(conn.set_count, 1);
        assert_eq!(conn.clear_count, 1);
        assert!(conn.current_user.is_none());
    }

    #[test]
    fn scope_clears_even_when_closure_panics() {
        let mut conn = FakeConn::default();
        let bundle = SessionVariableBundle {
            user_id: "u1".into(),
            roles_csv: String::new(),
            email: None,
            department: None,
        };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_session_scope(&mut conn, &bundle, |_c| panic!("boom"));
        }));

        assert!(result.is_err());
        assert_eq!(conn.clear_count, 1);
        assert!(conn.current_user.is_none());
    }
}
