use std::collections::BTreeMap;
use std::sync::Mutex;

use gatekeeper_contract::cursor::DocumentCursor;
use gatekeeper_toolserver::SessionVariableBundle;

use crate::model::Deal;

struct AuditEntry {
    #[allow(dead_code)]
    actor_user_id: String,
    #[allow(dead_code)]
    actor_roles: String,
    #[allow(dead_code)]
    action: String,
    #[allow(dead_code)]
    target_id: String,
}

struct Inner {
    deals: BTreeMap<String, Deal>,
    audit_log: Vec<AuditEntry>,
}

/// A `BTreeMap`-backed stand-in for a document store (spec §4.2's Sales
/// backend note): deals are keyed by id and paginated newest-first via a
/// `DocumentCursor` carrying the last id seen, mirroring how a real
/// document store's `_id`-descending cursor works.
pub struct DealStore {
    inner: Mutex<Inner>,
}

impl DealStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                deals: BTreeMap::new(),
                audit_log: Vec::new(),
            }),
        }
    }

    pub fn seeded() -> Self {
        let store = Self::new();
        let now = chrono::Utc::now().to_rfc3339();
        let seed: &[(&str, &str, &str, &str, f64, f64)] = &[
            ("deal-3001", "Northwind Traders", "u-sales-1", "negotiation", 95000.0, 0.08),
            ("deal-3002", "Contoso Ltd", "u-sales-1", "proposal", 42000.0, 0.07),
            ("deal-3003", "Fabrikam Inc", "u-sales-2", "closed_won", 61000.0, 0.09),
            ("deal-3004", "Globex Corp", "u-sales-2", "qualification", 18000.0, 0.06),
            ("deal-3005", "Initech", "u-sales-1", "negotiation", 73000.0, 0.08),
        ];
        let mut inner = store.inner.lock().unwrap();
        for (id, account, owner, stage, amount, rate) in seed {
            inner.deals.insert(
                id.to_string(),
                Deal {
                    id: id.to_string(),
                    account_name: account.to_string(),
                    owner_user_id: owner.to_string(),
                    stage: stage.to_string(),
                    amount: *amount,
                    commission_rate: *rate,
                    created_at: now.clone(),
                },
            );
        }
        drop(inner);
        store
    }

    /// Pages newest-id-first, the `DocumentCursor`'s natural order.
    pub fn list_deals(&self, stage: Option<&str>, limit: u32, cursor: Option<&DocumentCursor>) -> (Vec<Deal>, bool) {
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<Deal> = inner
            .deals
            .values()
            .rev()
            .filter(|d| stage.map_or(true, |s| d.stage == s))
            .filter(|d| cursor.map_or(true, |c| d.id.as_str() < c.last_id.as_str()))
            .take(limit as usize + 1)
            .cloned()
            .collect();

        let has_more = matches.len() > limit as usize;
        matches.truncate(limit as usize);
        (matches, has_more)
    }

    pub fn get_deal(&self, id: &str) -> Option<Deal> {
        self.inner.lock().unwrap().deals.get(id).cloned()
    }

    /// Marks an open deal `closed_won`. Called only from `/execute`.
    pub fn close_deal(&self, bundle: &SessionVariableBundle, id: &str) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let Some(deal) = inner.deals.get_mut(id) else {
            return 0;
        };
        if !deal.is_open() {
            return 0;
        }
        deal.stage = "closed_won".to_string();
        audit(&mut inner, bundle, "close_deal", id);
        1
    }

    /// Removes the deal entirely. Called only from `/execute`.
    pub fn delete_deal(&self, bundle: &SessionVariableBundle, id: &str) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        if inner.deals.remove(id).is_none() {
            return 0;
        }
        audit(&mut inner, bundle, "delete_deal", id);
        1
    }
}

impl Default for DealStore {
    fn default() -> Self {
        Self::new()
    }
}

fn audit(inner: &mut Inner, bundle: &SessionVariableBundle, action: &str, target_id: &str) {
    inner.audit_log.push(AuditEntry {
        actor_user_id: bundle.user_id.clone(),
        actor_roles: bundle.roles_csv.clone(),
        action: action.to_string(),
        target_id: target_id.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> SessionVariableBundle {
        SessionVariableBundle {
            user_id: "u1".into(),
            roles_csv: "sales-read,sales-write".into(),
            email: None,
            department: None,
        }
    }

    #[test]
    fn list_deals_pages_newest_first_and_filters_by_stage() {
        let store = DealStore::seeded();
        let (page, has_more) = store.list_deals(None, 2, None);
        assert_eq!(page.len(), 2);
        assert!(has_more);
        assert_eq!(page[0].id, "deal-3005");
        assert_eq!(page[1].id, "deal-3004");

        let cursor = DocumentCursor { last_id: page[1].id.clone() };
        let (next, _) = store.list_deals(None, 2, Some(&cursor));
        assert!(next.iter().all(|d| d.id.as_str() < "deal-3004"));
    }

    #[test]
    fn close_deal_is_idempotent() {
        let store = DealStore::seeded();
        assert_eq!(store.close_deal(&bundle(), "deal-3001"), 1);
        assert_eq!(store.close_deal(&bundle(), "deal-3001"), 0);
    }

    #[test]
    fn delete_deal_returns_zero_for_unknown_id() {
        let store = DealStore::seeded();
        assert_eq!(store.delete_deal(&bundle(), "no-such-deal"), 0);
    }
}
