use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gatekeeper_contract::ToolDescriptor;
use serde_json::{json, Value};

use crate::auth::AuthenticatedCaller;
use crate::ratelimit;
use crate::state::GatewayState;

/// GET /tools — the tool set this caller is currently allowed to invoke,
/// using the same allow-list test `/query` applies per call (spec §4.1).
pub async fn list_tools(
    State(state): State<Arc<GatewayState>>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    ratelimit::check(&state.general_limiter, &caller.user_id)?;

    let allowed: Vec<&ToolDescriptor> = state
        .tools
        .iter()
        .filter(|t| t.callable_by(&caller.roles))
        .collect();

    Ok(Json(json!({ "tools": allowed })))
}
