use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::GatewayState;

/// GET /health — liveness probe (mirrors the reference workspace's
/// gateway health handler, trimmed to what this gateway actually tracks).
pub async fn health(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "toolsRegistered": state.tools.len(),
        "activeQueries": state.active_queries.len(),
    }))
}
