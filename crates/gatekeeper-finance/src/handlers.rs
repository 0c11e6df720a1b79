use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use gatekeeper_contract::cursor::RelationalCursor;
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

use crate::error::FinanceError;
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
        "list_invoices" => list_invoices(&state, &ctx, args).unwrap_or_else(as_envelope),
        "get_invoice" => get_invoice(&state, &ctx, args).unwrap_or_else(as_envelope),
        "get_budget_summary" => get_budget_summary(&state, &ctx, args).unwrap_or_else(as_envelope),
        "void_invoice" => void_invoice_pending(&state, &ctx, args).unwrap_or_else(as_envelope),
        "issue_refund" => issue_refund_pending(&state, &ctx, args).unwrap_or_else(as_envelope),
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
        "void_invoice" => execute_void_invoice(&state, &ctx, body.payload).unwrap_or_else(as_envelope),
        "issue_refund" => execute_issue_refund(&state, &ctx, body.payload).unwrap_or_else(as_envelope),
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
    if ctx.satisfies_read(RoleTag::FinanceRead) {
        Ok(())
    } else {
        Err(ToolServerError::InsufficientPermissions)
    }
}

fn require_write(ctx: &ToolCallerContext) -> Result<(), ToolServerError> {
    if ctx.has_any_role(&[RoleTag::FinanceWrite]) {
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
struct ListInvoicesArgs {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    cursor: Option<String>,
}

fn list_invoices(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: ListInvoicesArgs = validate_and_parse(&schema::list_invoices_schema(), &args)?;
    let limit = clamp_limit(parsed.limit, DEFAULT_PAGINATION_MAX_LIMIT);
    let cursor: Option<RelationalCursor> = parsed
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()
        .map_err(|_| ToolServerError::InvalidCursor("malformed list_invoices cursor".into()))?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let (rows, has_more) = state
        .manager
        .list_invoices(
            &bundle,
            parsed.department.as_deref(),
            parsed.status.as_deref(),
            limit,
            cursor.as_ref(),
        )
        .map_err(FinanceError::into_tool_server_error)?;

    let next_cursor = has_more.then(|| {
        let last = rows.last().expect("has_more implies a non-empty page");
        encode_cursor(&RelationalCursor {
            primary: last.issued_date.clone(),
            secondary: last.created_at.clone(),
            id: last.id.clone(),
        })
    });

    let mut data: Vec<Value> = rows.iter().map(|i| serde_json::to_value(i).unwrap()).collect();
    redact_rows(&mut data, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));

    let pagination = build_page_meta(data.len() as u32, has_more, next_cursor);
    Ok(ToolResponse::success_paginated(Value::Array(data), pagination))
}

#[derive(Debug, Deserialize)]
struct GetInvoiceArgs {
    invoice_id: String,
}

fn get_invoice(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: GetInvoiceArgs = validate_and_parse(&schema::get_invoice_schema(), &args)?;
    let bundle = SessionVariableBundle::from_caller(ctx);
    let invoice = state
        .manager
        .get_invoice(&bundle, &parsed.invoice_id)
        .map_err(FinanceError::into_tool_server_error)?
        .ok_or_else(|| ToolServerError::NotFound(format!("no invoice with id {}", parsed.invoice_id)))?;

    let mut data = serde_json::to_value(&invoice).unwrap();
    if let Value::Object(ref mut obj) = data {
        redact_fields(obj, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));
    }
    Ok(ToolResponse::success(data))
}

fn get_budget_summary(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let _: Value = validate_and_parse(&schema::get_budget_summary_schema(), &args)?;
    let bundle = SessionVariableBundle::from_caller(ctx);
    let summary = state
        .manager
        .budget_summary(&bundle)
        .map_err(FinanceError::into_tool_server_error)?;
    Ok(ToolResponse::success(serde_json::to_value(&summary).unwrap()))
}

#[derive(Debug, Deserialize)]
struct VoidInvoiceArgs {
    invoice_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

fn void_invoice_pending(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    let parsed: VoidInvoiceArgs = validate_and_parse(&schema::void_invoice_schema(), &args)?;
    let bundle = SessionVariableBundle::from_caller(ctx);
    let invoice = state
        .manager
        .get_invoice(&bundle, &parsed.invoice_id)
        .map_err(FinanceError::into_tool_server_error)?
        .ok_or_else(|| ToolServerError::NotFound(format!("no invoice with id {}", parsed.invoice_id)))?;

    let message = format!("Void invoice {} for {}?", invoice.id, invoice.customer_name);
    let payload = json!({ "invoice_id": parsed.invoice_id, "originating_user_id": ctx.user_id });
    let builder = ConfirmationBuilder::new("void_invoice", schema::OWNER);
    let (action, _placeholder) = builder.build(&ctx.user_id, message.clone(), payload.clone());

    Ok(ToolResponse::pending(action.confirmation_id, message, payload))
}

#[derive(Debug, Deserialize)]
struct IssueRefundArgs {
    invoice_id: String,
    amount: f64,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

fn issue_refund_pending(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    let parsed: IssueRefundArgs = validate_and_parse(&schema::issue_refund_schema(), &args)?;
    let bundle = SessionVariableBundle::from_caller(ctx);
    let invoice = state
        .manager
        .get_invoice(&bundle, &parsed.invoice_id)
        .map_err(FinanceError::into_tool_server_error)?
        .ok_or_else(|| ToolServerError::NotFound(format!("no invoice with id {}", parsed.invoice_id)))?;

    let message = format!(
        "Refund {:.2} against invoice {} for {}?",
        parsed.amount, invoice.id, invoice.customer_name
    );
    let payload = json!({
        "invoice_id": parsed.invoice_id,
        "amount": parsed.amount,
        "originating_user_id": ctx.user_id,
    });
    let builder = ConfirmationBuilder::new("issue_refund", schema::OWNER);
    let (action, _placeholder) = builder.build(&ctx.user_id, message.clone(), payload.clone());

    Ok(ToolResponse::pending(action.confirmation_id, message, payload))
}

fn execute_void_invoice(state: &AppState, ctx: &ToolCallerContext, payload: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    #[derive(Deserialize)]
    struct Payload {
        invoice_id: String,
        originating_user_id: String,
    }
    let parsed: Payload = serde_json::from_value(payload)
        .map_err(|e| ToolServerError::Validation { path: "payload".into(), message: e.to_string() })?;
    require_same_user(ctx, &parsed.originating_user_id)?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let changed = state
        .manager
        .void_invoice(&bundle, &parsed.invoice_id)
        .map_err(FinanceError::into_tool_server_error)?;

    if changed == 0 {
        return Err(ToolServerError::NotFound(format!("no invoice with id {} (or already void)", parsed.invoice_id)));
    }
    Ok(ToolResponse::success(json!({ "invoice_id": parsed.invoice_id, "status": "void" })))
}

fn execute_issue_refund(state: &AppState, ctx: &ToolCallerContext, payload: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    #[derive(Deserialize)]
    struct Payload {
        invoice_id: String,
        amount: f64,
        originating_user_id: String,
    }
    let parsed: Payload = serde_json::from_value(payload)
        .map_err(|e| ToolServerError::Validation { path: "payload".into(), message: e.to_string() })?;
    require_same_user(ctx, &parsed.originating_user_id)?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let changed = state
        .manager
        .issue_refund(&bundle, &parsed.invoice_id, parsed.amount)
        .map_err(FinanceError::into_tool_server_error)?;

    if changed == 0 {
        return Err(ToolServerError::OperationFailed(format!(
            "refund of {:.2} against {} exceeds the invoice's paid amount, or the invoice is not paid",
            parsed.amount, parsed.invoice_id
        )));
    }
    Ok(ToolResponse::success(json!({ "invoice_id": parsed.invoice_id, "refunded_amount": parsed.amount })))
}
