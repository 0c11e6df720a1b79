use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use gatekeeper_contract::cursor::SearchCursor;
use gatekeeper_toolserver::SessionVariableBundle;
use serde_json::json;

use crate::model::Ticket;

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
    tickets: BTreeMap<String, Ticket>,
    /// Lowercased subject/body token -> ticket ids, the stand-in for a
    /// real inverted index (spec §4.2's Support backend note).
    word_index: HashMap<String, BTreeSet<String>>,
    audit_log: Vec<AuditEntry>,
}

/// An in-memory search-index-shaped store: tickets keyed by id plus a
/// tokenized word index, paginated with a "search after" `SearchCursor`
/// (sort-value tuple of the last hit) rather than an offset.
pub struct TicketIndex {
    inner: Mutex<Inner>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

impl TicketIndex {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                tickets: BTreeMap::new(),
                word_index: HashMap::new(),
                audit_log: Vec::new(),
            }),
        }
    }

    fn index_ticket(inner: &mut Inner, ticket: &Ticket) {
        for word in tokenize(&ticket.subject).into_iter().chain(tokenize(&ticket.body)) {
            inner.word_index.entry(word).or_default().insert(ticket.id.clone());
        }
    }

    pub fn seeded() -> Self {
        let store = Self::new();
        let now = chrono::Utc::now().to_rfc3339();
        let seed: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
            ("tick-4001", "Login page returns 500", "User reports a crash on the login page after password reset.", "open", "high", "alice@example.com", "2026-05-01T00:00:00Z"),
            ("tick-4002", "Billing statement missing line items", "The May billing statement is missing several line items.", "open", "normal", "bob@example.com", "2026-05-03T00:00:00Z"),
            ("tick-4003", "Crash on export", "Exporting a report crashes the desktop client.", "closed", "high", "carol@example.com", "2026-05-05T00:00:00Z"),
            ("tick-4004", "Password reset email delayed", "Password reset emails are arriving more than an hour late.", "open", "normal", "dave@example.com", "2026-05-06T00:00:00Z"),
            ("tick-4005", "Billing question", "Customer has a question about a billing charge.", "open", "low", "erin@example.com", "2026-05-07T00:00:00Z"),
        ];
        let mut inner = store.inner.lock().unwrap();
        for (id, subject, body, status, priority, email, created_at) in seed {
            let ticket = Ticket {
                id: id.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
                status: status.to_string(),
                priority: priority.to_string(),
                customer_email: email.to_string(),
                created_at: created_at.to_string(),
            };
            Self::index_ticket(&mut inner, &ticket);
            inner.tickets.insert(id.to_string(), ticket);
        }
        let _ = now;
        drop(inner);
        store
    }

    /// Newest-first, optionally narrowed by a full-text `query` (AND
    /// across tokens) and a `status` filter. `cursor` resumes after the
    /// last `(created_at, id)` pair previously returned.
    pub fn search_tickets(
        &self,
        query: Option<&str>,
        status: Option<&str>,
        limit: u32,
        cursor: Option<&SearchCursor>,
    ) -> (Vec<Ticket>, bool) {
        let inner = self.inner.lock().unwrap();

        let candidate_ids: Vec<String> = match query {
            Some(q) => {
                let tokens = tokenize(q);
                if tokens.is_empty() {
                    inner.tickets.keys().cloned().collect()
                } else {
                    let mut hits: Option<BTreeSet<String>> = None;
                    for token in &tokens {
                        let set = inner.word_index.get(token).cloned().unwrap_or_default();
                        hits = Some(match hits {
                            Some(acc) => acc.intersection(&set).cloned().collect(),
                            None => set,
                        });
                    }
                    hits.unwrap_or_default().into_iter().collect()
                }
            }
            None => inner.tickets.keys().cloned().collect(),
        };

        let mut matches: Vec<Ticket> = candidate_ids
            .into_iter()
            .filter_map(|id| inner.tickets.get(&id).cloned())
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect();

        matches.sort_by(|a, b| (b.created_at.as_str(), b.id.as_str()).cmp(&(a.created_at.as_str(), a.id.as_str())));

        if let Some(c) = cursor {
            let last_created = c.sort_values.first().and_then(|v| v.as_str()).unwrap_or("").to_string();
            matches.retain(|t| (t.created_at.as_str(), t.id.as_str()) < (last_created.as_str(), c.id.as_str()));
        }

        let has_more = matches.len() > limit as usize;
        matches.truncate(limit as usize);
        (matches, has_more)
    }

    pub fn get_ticket(&self, id: &str) -> Option<Ticket> {
        self.inner.lock().unwrap().tickets.get(id).cloned()
    }

    /// Marks an open ticket closed. Called only from `/execute`.
    pub fn close_ticket(&self, bundle: &SessionVariableBundle, id: &str) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let Some(ticket) = inner.tickets.get_mut(id) else {
            return 0;
        };
        if ticket.status == "closed" {
            return 0;
        }
        ticket.status = "closed".to_string();
        inner.audit_log.push(AuditEntry {
            actor_user_id: bundle.user_id.clone(),
            actor_roles: bundle.roles_csv.clone(),
            action: "close_ticket".to_string(),
            target_id: id.to_string(),
        });
        1
    }
}

impl Default for TicketIndex {
    fn default() -> Self {
        Self::new()
    }
}

pub fn cursor_sort_values(created_at: &str) -> Vec<serde_json::Value> {
    vec![json!(created_at)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> SessionVariableBundle {
        SessionVariableBundle {
            user_id: "u1".into(),
            roles_csv: "support-read,support-write".into(),
            email: None,
            department: None,
        }
    }

    #[test]
    fn search_matches_all_query_tokens() {
        let store = TicketIndex::seeded();
        let (hits, _) = store.search_tickets(Some("billing"), None, 10, None);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|t| t.id == "tick-4002" || t.id == "tick-4005"));
    }

    #[test]
    fn search_paginates_newest_first() {
        let store = TicketIndex::seeded();
        let (page, has_more) = store.search_tickets(None, None, 2, None);
        assert_eq!(page.len(), 2);
        assert!(has_more);
        assert_eq!(page[0].id, "tick-4005");

        let cursor = SearchCursor {
            sort_values: cursor_sort_values(&page[1].created_at),
            id: page[1].id.clone(),
        };
        let (next, _) = store.search_tickets(None, None, 2, Some(&cursor));
        assert!(next.iter().all(|t| t.id != page[0].id && t.id != page[1].id));
    }

    #[test]
    fn close_ticket_is_idempotent() {
        let store = TicketIndex::seeded();
        assert_eq!(store.close_ticket(&bundle(), "tick-4001"), 1);
        assert_eq!(store.close_ticket(&bundle(), "tick-4001"), 0);
    }
}
