use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gatekeeper_contract::ToolResponse;
use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_sales::{router, schema, AppState, DealStore};
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
        store: DealStore::seeded(),
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
async fn caller_without_sales_read_is_denied() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req("/tools/list_deals", "support-read", serde_json::json!({})))
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
async fn list_deals_pages_newest_first_and_redacts_commission() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req("/tools/list_deals", "sales-read", serde_json::json!({ "limit": 2 })))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, pagination } => {
            let rows = data.as_array().unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0]["id"], "deal-3005");
            assert!(pagination.unwrap().has_more);
            assert!(rows.iter().all(|r| r.get("commission_rate").unwrap().is_null()));
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
            "/tools/delete_deal",
            "sales-read,sales-write",
            serde_json::json!({ "deal_id": "deal-3001" }),
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
        "sales-read,sales-write",
        serde_json::json!({ "actionTag": "delete_deal", "payload": payload }),
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
async fn close_deal_requires_confirmation_then_executes() {
    let state = test_state();

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/close_deal",
            "sales-read,sales-write",
            serde_json::json!({ "deal_id": "deal-3001" }),
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
            "sales-read,sales-write",
            serde_json::json!({ "actionTag": "close_deal", "payload": payload }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => assert_eq!(data["stage"], "closed_won"),
        other => panic!("expected success envelope, got {other:?}"),
    }

    let app = router::build_router(state);
    let resp = app
        .oneshot(req(
            "/tools/close_deal",
            "sales-read,sales-write",
            serde_json::json!({ "deal_id": "deal-3001" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::PendingConfirmation { .. } => {}
        other => panic!("expected pendingConfirmation envelope, got {other:?}"),
    }
}
