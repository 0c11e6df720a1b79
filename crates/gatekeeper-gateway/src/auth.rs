use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use gatekeeper_core::types::CallerContext;
use serde_json::{json, Value};

use crate::state::GatewayState;

/// Extracts and verifies the bearer credential on any handler that takes
/// it as a parameter (spec §4.1 "Credential verification"). A missing or
/// invalid credential short-circuits the handler with `401` before any
/// streaming starts — it never reaches the `/query` event stream.
pub struct AuthenticatedCaller(pub CallerContext);

#[async_trait::async_trait]
impl FromRequestParts<Arc<GatewayState>> for AuthenticatedCaller {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| unauthorized("missing bearer credential"))?;

        let ctx = state
            .verifier
            .verify(token)
            .await
            .map_err(|e| unauthorized(&e.to_string()))?;

        Ok(AuthenticatedCaller(ctx))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let raw = parts.headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ")
}

fn unauthorized(detail: &str) -> (StatusCode, Json<Value>) {
    tracing::debug!(detail, "credential rejected");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "code": "UNAUTHORIZED", "message": "invalid or expired credential" })),
    )
}
