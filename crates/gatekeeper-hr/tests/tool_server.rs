use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gatekeeper_contract::ToolResponse;
use gatekeeper_core::config::ToolServerConfig;
use gatekeeper_hr::{db, router, schema, AppState, HrManager};
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
            unmasked_roles: vec!["manager".to_string(), "executive".to_string()],
        },
        manager: HrManager::new(conn),
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
async fn caller_without_hr_read_is_denied() {
    let app = router::build_router(test_state());
    let resp = app
        .oneshot(req(
            "/tools/list_employees",
            "finance-read",
            serde_json::json!({}),
        ))
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
async fn list_employees_paginates_and_redacts_salary_for_plain_hr_read() {
    let state = test_state();

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/list_employees",
            "hr-read",
            serde_json::json!({ "limit": 2 }),
        ))
        .await
        .unwrap();
    let (status, body) = envelope(resp).await;
    assert_eq!(status, StatusCode::OK);

    let (data, pagination) = match body {
        ToolResponse::Success { data, pagination } => (data, pagination.unwrap()),
        other => panic!("expected success envelope, got {other:?}"),
    };
    let rows = data.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(pagination.has_more);
    assert!(pagination.next_cursor.is_some());
    for row in rows {
        assert!(row.get("salary").unwrap().is_null());
    }

    let app = router::build_router(state);
    let resp = app
        .oneshot(req(
            "/tools/list_employees",
            "hr-read,manager",
            serde_json::json!({ "limit": 2 }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => {
            let rows = data.as_array().unwrap();
            assert!(rows.iter().all(|r| !r.get("salary").unwrap().is_null()));
        }
        other => panic!("expected success envelope, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_employee_requires_confirmation_then_executes() {
    let state = test_state();

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/delete_employee",
            "hr-read,hr-write",
            serde_json::json!({ "employee_id": "e-1001" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    let (confirmation_id, payload) = match body {
        ToolResponse::PendingConfirmation {
            confirmation_id,
            data,
            ..
        } => (confirmation_id, data),
        other => panic!("expected pendingConfirmation envelope, got {other:?}"),
    };
    assert!(!confirmation_id.is_empty());
    assert_eq!(payload["employee_id"], "e-1001");

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/execute",
            "hr-read,hr-write",
            serde_json::json!({ "actionTag": "delete_employee", "payload": payload }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Success { data, .. } => assert_eq!(data["deleted"], true),
        other => panic!("expected success envelope, got {other:?}"),
    }

    let app = router::build_router(state);
    let resp = app
        .oneshot(req(
            "/tools/get_employee",
            "hr-read",
            serde_json::json!({ "employee_id": "e-1001" }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Error { code, .. } => assert_eq!(code, "NOT_FOUND"),
        other => panic!("expected error envelope after deletion, got {other:?}"),
    }
}

#[tokio::test]
async fn execute_rejects_a_caller_other_than_the_one_who_requested_confirmation() {
    let state = test_state();

    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/delete_employee",
            "hr-read,hr-write",
            serde_json::json!({ "employee_id": "e-1001" }),
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
        "hr-read,hr-write",
        serde_json::json!({ "actionTag": "delete_employee", "payload": payload }),
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
async fn write_without_hr_write_cannot_reach_execute() {
    let state = test_state();
    let app = router::build_router(state.clone());
    let resp = app
        .oneshot(req(
            "/tools/update_employee_salary",
            "hr-read",
            serde_json::json!({ "employee_id": "e-1001", "new_salary": 1.0 }),
        ))
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    match body {
        ToolResponse::Error { code, .. } => assert_eq!(code, "INSUFFICIENT_PERMISSIONS"),
        other => panic!("expected error envelope, got {other:?}"),
    }
}
