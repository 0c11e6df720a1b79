use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use gatekeeper_contract::cursor::SearchCursor;
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
use crate::store::cursor_sort_values;

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
        "search_tickets" => search_tickets(&state, &ctx, args).unwrap_or_else(as_envelope),
        "get_ticket" => get_ticket(&state, &ctx, args).unwrap_or_else(as_envelope),
        "close_ticket" => close_ticket_pending(&state, &ctx, args).unwrap_or_else(as_envelope),
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
        "close_ticket" => execute_close_ticket(&state, &ctx, body.payload).unwrap_or_else(as_envelope),
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
    if ctx.satisfies_read(RoleTag::SupportRead) {
        Ok(())
    } else {
        Err(ToolServerError::InsufficientPermissions)
    }
}

fn require_write(ctx: &ToolCallerContext) -> Result<(), ToolServerError> {
    if ctx.has_any_role(&[RoleTag::SupportWrite]) {
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
struct SearchTicketsArgs {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    cursor: Option<String>,
}

fn search_tickets(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: SearchTicketsArgs = validate_and_parse(&schema::search_tickets_schema(), &args)?;
    let limit = clamp_limit(parsed.limit, DEFAULT_PAGINATION_MAX_LIMIT);
    let cursor: Option<SearchCursor> = parsed
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()
        .map_err(|_| ToolServerError::InvalidCursor("malformed search_tickets cursor".into()))?;

    let (rows, has_more) = state.store.search_tickets(
        parsed.query.as_deref(),
        parsed.status.as_deref(),
        limit,
        cursor.as_ref(),
    );

    let next_cursor = has_more.then(|| {
        let last = rows.last().expect("has_more implies a non-empty page");
        encode_cursor(&SearchCursor {
            sort_values: cursor_sort_values(&last.created_at),
            id: last.id.clone(),
        })
    });

    let mut data: Vec<Value> = rows.iter().map(|t| serde_json::to_value(t).unwrap()).collect();
    redact_rows(&mut data, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));

    let pagination = build_page_meta(data.len() as u32, has_more, next_cursor);
    Ok(ToolResponse::success_paginated(Value::Array(data), pagination))
}

#[derive(Debug, Deserialize)]
struct GetTicketArgs {
    ticket_id: String,
}

fn get_ticket(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: GetTicketArgs = validate_and_parse(&schema::get_ticket_schema(), &args)?;
    let ticket = state
        .store
        .get_ticket(&parsed.ticket_id)
        .ok_or_else(|| ToolServerError::NotFound(format!("no ticket with id {}", parsed.ticket_id)))?;

    let mut data = serde_json::to_value(&ticket).unwrap();
    if let Value::Object(ref mut obj) = data {
        redact_fields(obj, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));
    }
    Ok(ToolResponse::success(data))
}

#[derive(Debug, Deserialize)]
struct CloseTicketArgs {
    ticket_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

fn close_ticket_pending(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    let parsed: CloseTicketArgs = validate_and_parse(&schema::close_ticket_schema(), &args)?;
    let ticket = state
        .store
        .get_ticket(&parsed.ticket_id)
        .ok_or_else(|| ToolServerError::NotFound(format!("no ticket with id {}", parsed.ticket_id)))?;

    let message = format!("Close ticket {} ({})?", ticket.id, ticket.subject);
    let payload = json!({ "ticket_id": parsed.ticket_id, "originating_user_id": ctx.user_id });
    let builder = ConfirmationBuilder::new("close_ticket", schema::OWNER);
    let (action, _placeholder) = builder.build(&ctx.user_id, message.clone(), payload.clone());

    Ok(ToolResponse::pending(action.confirmation_id, message, payload))
}

fn execute_close_ticket(state: &AppState, ctx: &ToolCallerContext, payload: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    #[derive(Deserialize)]
    struct Payload {
        ticket_id: String,
        originating_user_id: String,
    }
    let parsed: Payload = serde_json::from_value(payload)
        .map_err(|e| ToolServerError::Validation { path: "payload".into(), message: e.to_string() })?;
    require_same_user(ctx, &parsed.originating_user_id)?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let changed = state.store.close_ticket(&bundle, &parsed.ticket_id);
    if changed == 0 {
        return Err(ToolServerError::NotFound(format!(
            "no open ticket with id {}",
            parsed.ticket_id
        )));
    }
    Ok(ToolResponse::success(json!({ "ticket_id": parsed.ticket_id, "status": "closed" })))
}
