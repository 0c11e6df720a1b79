use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use gatekeeper_contract::cursor::DocumentCursor;
use gatekeeper_contract::{decode_cursor, encode_cursor, DiscoverResponse, ToolResponse};
use gatekeeper_core::config::DEFAULT_PAGINATION_MAX_LIMIT;
use gatekeeper_core::error::ErrorCode;
use gatekeeper_core::types::RoleTag;
use gatekeeper_toolserver::{
    build_page_meta, clamp_limit, discover_response, redact_fields, redact_rows, validate_and_parse,
    ConfirmationBuilder, SessionVariableBundle, ToolCallerContext, ToolServerError,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::model::SENSITIVE_FIELDS;
use crate::schema;
use crate::state::AppState;

pub async fn discover(State(state): State<Arc<AppState>>) -> Json<DiscoverResponse> {
    Json(discover_response(state.descriptors.clone()))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok", "toolsRegistered": state.descriptors.len() }))
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(rename = "actionTag")]
    action_tag: String,
    payload: Value,
}

/// POST /tools/{name}. Always returns HTTP 200 — the envelope's `status`
/// tag, not the HTTP status, carries success/error/pending.
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(args): Json<Value>,
) -> Json<ToolResponse> {
    let ctx = match ToolCallerContext::from_headers(&headers) {
        Ok(c) => c,
        Err(e) => return respond(e),
    };

    Json(match name.as_str() {
        "list_deals" => list_deals(&state, &ctx, args).unwrap_or_else(as_envelope),
        "get_deal" => get_deal(&state, &ctx, args).unwrap_or_else(as_envelope),
        "close_deal" => close_deal_pending(&state, &ctx, args).unwrap_or_else(as_envelope),
        "delete_deal" => delete_deal_pending(&state, &ctx, args).unwrap_or_else(as_envelope),
        other => ToolResponse::error(ErrorCode::NotFound, format!("unknown tool: {other}")),
    })
}

pub async fn execute(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ExecuteRequest>,
) -> Json<ToolResponse> {
    let ctx = match ToolCallerContext::from_headers(&headers) {
        Ok(c) => c,
        Err(e) => return respond(e),
    };

    Json(match body.action_tag.as_str() {
        "close_deal" => execute_close_deal(&state, &ctx, body.payload).unwrap_or_else(as_envelope),
        "delete_deal" => execute_delete_deal(&state, &ctx, body.payload).unwrap_or_else(as_envelope),
        other => ToolResponse::error(ErrorCode::OperationFailed, format!("unknown action tag: {other}")),
    })
}

fn respond(e: ToolServerError) -> Json<ToolResponse> {
    Json(as_envelope(e))
}

fn as_envelope(e: ToolServerError) -> ToolResponse {
    ToolResponse::error(e.code(), e.public_message())
}

fn require_read(ctx: &ToolCallerContext) -> Result<(), ToolServerError> {
    if ctx.satisfies_read(RoleTag::SalesRead) {
        Ok(())
    } else {
        Err(ToolServerError::InsufficientPermissions)
    }
}

fn require_write(ctx: &ToolCallerContext) -> Result<(), ToolServerError> {
    if ctx.has_any_role(&[RoleTag::SalesWrite]) {
        Ok(())
    } else {
        Err(ToolServerError::InsufficientPermissions)
    }
}

/// Re-verifies that the caller executing a confirmed action is the same
/// caller it was issued to (spec §4.4: `/execute` must re-check the
/// originating user id carried in the confirmation data).
fn require_same_user(ctx: &ToolCallerContext, originating_user_id: &str) -> Result<(), ToolServerError> {
    if ctx.user_id == originating_user_id {
        Ok(())
    } else {
        Err(ToolServerError::UserMismatch)
    }
}

#[derive(Debug, Deserialize)]
struct ListDealsArgs {
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    cursor: Option<String>,
}

fn list_deals(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: ListDealsArgs = validate_and_parse(&schema::list_deals_schema(), &args)?;
    let limit = clamp_limit(parsed.limit, DEFAULT_PAGINATION_MAX_LIMIT);
    let cursor: Option<DocumentCursor> = parsed
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()
        .map_err(|_| ToolServerError::InvalidCursor("malformed list_deals cursor".into()))?;

    let (rows, has_more) = state.store.list_deals(parsed.stage.as_deref(), limit, cursor.as_ref());

    let next_cursor = has_more.then(|| {
        let last = rows.last().expect("has_more implies a non-empty page");
        encode_cursor(&DocumentCursor { last_id: last.id.clone() })
    });

    let mut data: Vec<Value> = rows.iter().map(|d| serde_json::to_value(d).unwrap()).collect();
    redact_rows(&mut data, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));

    let pagination = build_page_meta(data.len() as u32, has_more, next_cursor);
    Ok(ToolResponse::success_paginated(Value::Array(data), pagination))
}

#[derive(Debug, Deserialize)]
struct GetDealArgs {
    deal_id: String,
}

fn get_deal(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: GetDealArgs = validate_and_parse(&schema::get_deal_schema(), &args)?;
    let deal = state
        .store
        .get_deal(&parsed.deal_id)
        .ok_or_else(|| ToolServerError::NotFound(format!("no deal with id {}", parsed.deal_id)))?;

    let mut data = serde_json::to_value(&deal).unwrap();
    if let Value::Object(ref mut obj) = data {
        redact_fields(obj, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));
    }
    Ok(ToolResponse::success(data))
}

#[derive(Debug, Deserialize)]
struct CloseDealArgs {
    deal_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

fn close_deal_pending(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    let parsed: CloseDealArgs = validate_and_parse(&schema::close_deal_schema(), &args)?;
    let deal = state
        .store
        .get_deal(&parsed.deal_id)
        .ok_or_else(|| ToolServerError::NotFound(format!("no deal with id {}", parsed.deal_id)))?;

    let message = format!("Close deal {} ({}) as won?", deal.id, deal.account_name);
    let payload = json!({ "deal_id": parsed.deal_id, "originating_user_id": ctx.user_id });
    let builder = ConfirmationBuilder::new("close_deal", schema::OWNER);
    let (action, _placeholder) = builder.build(&ctx.user_id, message.clone(), payload.clone());

    Ok(ToolResponse::pending(action.confirmation_id, message, payload))
}

#[derive(Debug, Deserialize)]
struct DeleteDealArgs {
    deal_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

fn delete_deal_pending(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    let parsed: DeleteDealArgs = validate_and_parse(&schema::delete_deal_schema(), &args)?;
    let deal = state
        .store
        .get_deal(&parsed.deal_id)
        .ok_or_else(|| ToolServerError::NotFound(format!("no deal with id {}", parsed.deal_id)))?;

    let message = format!("Delete deal {} ({})?", deal.id, deal.account_name);
    let payload = json!({ "deal_id": parsed.deal_id, "originating_user_id": ctx.user_id });
    let builder = ConfirmationBuilder::new("delete_deal", schema::OWNER);
    let (action, _placeholder) = builder.build(&ctx.user_id, message.clone(), payload.clone());

    Ok(ToolResponse::pending(action.confirmation_id, message, payload))
}

fn execute_close_deal(state: &AppState, ctx: &ToolCallerContext, payload: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    #[derive(Deserialize)]
    struct Payload {
        deal_id: String,
        originating_user_id: String,
    }
    let parsed: Payload = serde_json::from_value(payload)
        .map_err(|e| ToolServerError::Validation { path: "payload".into(), message: e.to_string() })?;
    require_same_user(ctx, &parsed.originating_user_id)?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let changed = state.store.close_deal(&bundle, &parsed.deal_id);
    if changed == 0 {
        return Err(ToolServerError::NotFound(format!(
            "no open deal with id {}",
            parsed.deal_id
        )));
    }
    Ok(ToolResponse::success(json!({ "deal_id": parsed.deal_id, "stage": "closed_won" })))
}

fn execute_delete_deal(state: &AppState, ctx: &ToolCallerContext, payload: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    #[derive(Deserialize)]
    struct Payload {
        deal_id: String,
        originating_user_id: String,
    }
    let parsed: Payload = serde_json::from_value(payload)
        .map_err(|e| ToolServerError::Validation { path: "payload".into(), message: e.to_string() })?;
    require_same_user(ctx, &parsed.originating_user_id)?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let changed = state.store.delete_deal(&bundle, &parsed.deal_id);
    if changed == 0 {
        return Err(ToolServerError::NotFound(format!("no deal with id {}", parsed.deal_id)));
    }
    Ok(ToolResponse::success(json!({ "deal_id": parsed.deal_id, "deleted": true })))
}
