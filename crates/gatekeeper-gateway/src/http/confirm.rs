use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use gatekeeper_contract::ToolResponse;
use gatekeeper_core::error::ErrorCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthenticatedCaller;
use crate::ratelimit;
use crate::state::GatewayState;
use crate::tool_client;

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub approved: bool,
}

/// POST /confirm/{confirmationId} — spec §4.1 "Confirmation execution".
/// Not streamed: a single JSON object, either the executed tool's result
/// envelope or `{status: "cancelled"}` on deny.
pub async fn confirm(
    State(state): State<Arc<GatewayState>>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(confirmation_id): Path<String>,
    Json(body): Json<ConfirmRequest>,
) -> (StatusCode, Json<Value>) {
    if let Err(resp) = ratelimit::check(&state.general_limiter, &caller.user_id) {
        return resp;
    }

    let action = match state.pending_store.take(&confirmation_id).await {
        Ok(Some(action)) => action,
        Ok(None) => {
            return error_response(ErrorCode::ConfirmationExpired, "confirmation id is unknown or has expired");
        }
        Err(e) => {
            tracing::warn!(error = %e, confirmation_id, "pending store lookup failed");
            return error_response(ErrorCode::DatabaseError, "could not reach the confirmation store");
        }
    };

    if action.originating_user_id != caller.user_id {
        // `take` already removed this from the store — put it back so the
        // caller it was actually issued to can still confirm or deny it.
        if let Err(e) = state.pending_store.put(&action, state.config.pending.ttl_secs).await {
            tracing::warn!(error = %e, confirmation_id, "failed to restore pending action after mismatched confirm");
        }
        return error_response(ErrorCode::UserMismatch, "this confirmation was not issued to the requesting caller");
    }

    if !body.approved {
        return (StatusCode::OK, Json(json!({ "status": "cancelled" })));
    }

    let Some(endpoint) = state.config.tool_servers.iter().find(|e| e.name == action.owner) else {
        return error_response(ErrorCode::UpstreamError, "no endpoint configured for this confirmation's owner");
    };

    let payload = json!({
        "actionTag": action.action_tag,
        "confirmationId": action.confirmation_id,
        "payload": action.payload,
    });

    let timeout = Duration::from_secs(state.config.timeout.tool_write_secs);
    let invocation = tool_client::invoke_execute(&state.http, &endpoint.base_url, payload, &caller, timeout).await;
    let redacted = invocation.envelope.redact_technical_details();

    let status = match &redacted {
        ToolResponse::Error { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };

    (status, Json(serde_json::to_value(&redacted).unwrap_or(Value::Null)))
}

fn error_response(code: ErrorCode, message: &str) -> (StatusCode, Json<Value>) {
    let status = match code {
        ErrorCode::ConfirmationExpired | ErrorCode::UserMismatch => StatusCode::CONFLICT,
        ErrorCode::DatabaseError | ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(serde_json::to_value(ToolResponse::error(code, message)).unwrap_or(Value::Null)))
}
