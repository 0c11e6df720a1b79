use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gatekeeper_contract::ToolResponse;
use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_finance::{db, router, schema, AppState, FinanceManager};
use http_body_util::BodyExt;
use rusqlite::Connection;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    let conn = Connection::open_in_memory().unwrap();
    db::init_db(&conn).unwrap();
    db::seed(&conn).unwrap();

    Arc::new(AppState {
        config: ToolServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 0,
            database_path: None,
            unmasked_roles: vec!["manager".to_string()],
        },
        manager: FinanceManager::new(conn),
        descriptors: schema::descriptors(),
    })
}

async fn envelope(resp: axum::response::Response) -> (StatusCode, ToolResponse) {
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn req(path: &str, roles: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("x-caller-id", "u1")
        .header("x-caller-roles", roles)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn caller_without_finance_read_is_denied() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req("/tools/list_invoices", "hr-read", serde_json::json!({})))
        .await
        .unwrap();

    let (status, body) = envelope(resp).await;
    assert_eq!(status, StatusCode::OK);
    match body {
        ToolResponse::Error { code, .. } => assert_eq!(code, "INSUFFICIENT_PERMISSIONS"),
        other => panic!("expected error envelope, got {other:?}"),
    }
}

#[tokio::test]
async fn list_invoices_filters_by_status_and_redacts_account_number() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req(
            "/tools/list_invoices",
            "finance-read",
            serde_json::json!({ "status": "open" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => {
            let rows = data.as_array().unwrap();
            assert!(rows.iter().all(|r| r["status"] == "open"));
            assert!(rows.iter().all(|r| r.get("account_number").unwrap().is_null()));
        }
        other => panic!("expected success envelope, got {other:?}"),
    }
}

#[tokio::test]
async fn budget_summary_excludes_void_invoices() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req(
            "/tools/get_budget_summary",
            "finance-read",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => {
            let by_department = data["by_department"].as_array().unwrap();
            assert!(by_department.iter().all(|d| d["department"] != "finance"));
        }
        other => panic!("expected success envelope, got {other:?}"),
    }
}

#[tokio::test]
async fn execute_rejects_a_caller_other_than_the_one_who_requested_confirmation() {
    let state = test_state();

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/void_invoice",
            "finance-read,finance-write",
            serde_json::json!({ "invoice_id": "inv-2001" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    let payload = match body {
        ToolResponse::PendingConfirmation { data, .. } => data,
        other => panic!("expected pendingConfirmation envelope, got {other:?}"),
    };

    let app = router::build_router(state);
    let mut execute_req = req(
        "/execute",
        "finance-read,finance-write",
        serde_json::json!({ "actionTag": "void_invoice", "payload": payload }),
    );
    execute_req.headers_mut().insert("x-caller-id", "someone-else".parse().unwrap());
    let resp = app.oneshot(execute_req).await.unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Error { code, .. } => assert_eq!(code, "USER_MISMATCH"),
        other => panic!("expected error envelope, got {other:?}"),
    }
}

#[tokio::test]
async fn issue_refund_requires_confirmation_then_executes() {
    let state = test_state();

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/issue_refund",
            "finance-read,finance-write",
            serde_json::json!({ "invoice_id": "inv-2001", "amount": 500.0 }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    let (confirmation_id, payload) = match body {
        ToolResponse::PendingConfirmation { confirmation_id, data, .. } => (confirmation_id, data),
        other => panic!("expected pendingConfirmation envelope, got {other:?}"),
    };
    assert!(!confirmation_id.is_empty());

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/execute",
            "finance-read,finance-write",
            serde_json::json!({ "actionTag": "issue_refund", "payload": payload }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => assert_eq!(data["refunded_amount"], 500.0),
        other => panic!("expected success envelope, got {other:?}"),
    }

    let app = router::build_router(state);
    let resp = app
        .oneshot(req(
            "/tools/issue_refund",
            "finance-read,finance-write",
            serde_json::json!({ "invoice_id": "inv-2001", "amount": 1_000_000.0 }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::PendingConfirmation { .. } => {}
        other => panic!("expected pendingConfirmation envelope, got {other:?}"),
    }
}
