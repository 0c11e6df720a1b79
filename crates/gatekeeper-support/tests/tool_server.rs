use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gatekeeper_contract::ToolResponse;
use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_support::{router, schema, AppState, TicketIndex};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    Arc::new(AppState {
        config: ToolServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 0,
            database_path: None,
            unmasked_roles: vec![],
        },
        store: TicketIndex::seeded(),
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
async fn caller_without_support_read_is_denied() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req("/tools/search_tickets", "hr-read", serde_json::json!({})))
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
async fn search_tickets_matches_query_and_redacts_email() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req(
            "/tools/search_tickets",
            "support-read",
            serde_json::json!({ "query": "billing" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => {
            let rows = data.as_array().unwrap();
            assert_eq!(rows.len(), 2);
            assert!(rows.iter().all(|r| r.get("customer_email").unwrap().is_null()));
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
            "/tools/close_ticket",
            "support-read,support-write",
            serde_json::json!({ "ticket_id": "tick-4001" }),
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
        "support-read,support-write",
        serde_json::json!({ "actionTag": "close_ticket", "payload": payload }),
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
async fn close_ticket_requires_confirmation_then_executes() {
    let state = test_state();

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/close_ticket",
            "support-read,support-write",
            serde_json::json!({ "ticket_id": "tick-4001" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    let payload = match body {
        ToolResponse::PendingConfirmation { data, .. } => data,
        other => panic!("expected pendingConfirmation envelope, got {other:?}"),
    };

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/execute",
            "support-read,support-write",
            serde_json::json!({ "actionTag": "close_ticket", "payload": payload }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => assert_eq!(data["status"], "closed"),
        other => panic!("expected success envelope, got {other:?}"),
    }

    let app = router::build_router(state);
    let resp = app
        .oneshot(req(
            "/tools/get_ticket",
            "support-read",
            serde_json::json!({ "ticket_id": "tick-4001" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => assert_eq!(data["status"], "closed"),
        other => panic!("expected success envelope, got {other:?}"),
    }
}
