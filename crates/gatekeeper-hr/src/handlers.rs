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

use crate::error::HrError;
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
/// tag, not the HTTP status, carries success/error/pending (spec §3: a
/// non-2xx here is indistinguishable from connection failure to the
/// Gateway's client).
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
        "list_employees" => list_employees(&state, &ctx, args).unwrap_or_else(as_envelope),
        "get_employee" => get_employee(&state, &ctx, args).unwrap_or_else(as_envelope),
        "update_employee_salary" => update_employee_salary_pending(&state, &ctx, args).unwrap_or_else(as_envelope),
        "delete_employee" => delete_employee_pending(&state, &ctx, args).unwrap_or_else(as_envelope),
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
        "update_employee_salary" => execute_update_salary(&state, &ctx, body.payload).unwrap_or_else(as_envelope),
        "delete_employee" => execute_delete_employee(&state, &ctx, body.payload).unwrap_or_else(as_envelope),
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
    if ctx.satisfies_read(RoleTag::HrRead) {
        Ok(())
    } else {
        Err(ToolServerError::InsufficientPermissions)
    }
}

fn require_write(ctx: &ToolCallerContext) -> Result<(), ToolServerError> {
    if ctx.has_any_role(&[RoleTag::HrWrite]) {
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
struct ListEmployeesArgs {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    cursor: Option<String>,
}

fn list_employees(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: ListEmployeesArgs = validate_and_parse(&schema::list_employees_schema(), &args)?;
    let limit = clamp_limit(parsed.limit, DEFAULT_PAGINATION_MAX_LIMIT);
    let cursor: Option<RelationalCursor> = parsed
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()
        .map_err(|_| ToolServerError::InvalidCursor("malformed list_employees cursor".into()))?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let (rows, has_more) =
        state
            .manager
            .list_employees(&bundle, parsed.department.as_deref(), limit, cursor.as_ref())
            .map_err(HrError::into_tool_server_error)?;

    let next_cursor = has_more.then(|| {
        let last = rows.last().expect("has_more implies a non-empty page");
        encode_cursor(&RelationalCursor {
            primary: last.last_name.clone(),
            secondary: last.first_name.clone(),
            id: last.id.clone(),
        })
    });

    let mut data: Vec<Value> = rows.iter().map(|e| serde_json::to_value(e).unwrap()).collect();
    redact_rows(&mut data, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));

    let pagination = build_page_meta(data.len() as u32, has_more, next_cursor);
    Ok(ToolResponse::success_paginated(Value::Array(data), pagination))
}

#[derive(Debug, Deserialize)]
struct GetEmployeeArgs {
    employee_id: String,
}

fn get_employee(state: &AppState, ctx: &ToolCallerContext, args: Value) -> Result<ToolResponse, ToolServerError> {
    require_read(ctx)?;
    let parsed: GetEmployeeArgs = validate_and_parse(&schema::get_employee_schema(), &args)?;
    let bundle = SessionVariableBundle::from_caller(ctx);
    let employee = state
        .manager
        .get_employee(&bundle, &parsed.employee_id)
        .map_err(HrError::into_tool_server_error)?
        .ok_or_else(|| ToolServerError::NotFound(format!("no employee with id {}", parsed.employee_id)))?;

    let mut data = serde_json::to_value(&employee).unwrap();
    if let Value::Object(ref mut obj) = data {
        redact_fields(obj, SENSITIVE_FIELDS, state.unmasked(&ctx.roles));
    }
    Ok(ToolResponse::success(data))
}

#[derive(Debug, Deserialize)]
struct UpdateSalaryArgs {
    employee_id: String,
    new_salary: f64,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

fn update_employee_salary_pending(
    state: &AppState,
    ctx: &ToolCallerContext,
    args: Value,
) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    let parsed: UpdateSalaryArgs = validate_and_parse(&schema::update_employee_salary_schema(), &args)?;
    let bundle = SessionVariableBundle::from_caller(ctx);
    let employee = state
        .manager
        .get_employee(&bundle, &parsed.employee_id)
        .map_err(HrError::into_tool_server_error)?
        .ok_or_else(|| ToolServerError::NotFound(format!("no employee with id {}", parsed.employee_id)))?;

    let message = format!(
        "Change {}'s salary to {:.2}?",
        employee.display_name(),
        parsed.new_salary
    );
    let payload = json!({
        "employee_id": parsed.employee_id,
        "new_salary": parsed.new_salary,
        "originating_user_id": ctx.user_id,
    });
    let builder = ConfirmationBuilder::new("update_employee_salary", schema::OWNER);
    let (action, _placeholder) = builder.build(&ctx.user_id, message.clone(), payload.clone());

    Ok(ToolResponse::pending(action.confirmation_id, message, payload))
}

#[derive(Debug, Deserialize)]
struct DeleteEmployeeArgs {
    employee_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

fn delete_employee_pending(
    state: &AppState,
    ctx: &ToolCallerContext,
    args: Value,
) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    let parsed: DeleteEmployeeArgs = validate_and_parse(&schema::delete_employee_schema(), &args)?;
    let bundle = SessionVariableBundle::from_caller(ctx);
    let employee = state
        .manager
        .get_employee(&bundle, &parsed.employee_id)
        .map_err(HrError::into_tool_server_error)?
        .ok_or_else(|| ToolServerError::NotFound(format!("no employee with id {}", parsed.employee_id)))?;

    let message = format!("Delete employee {}?", employee.display_name());
    let payload = json!({ "employee_id": parsed.employee_id, "originating_user_id": ctx.user_id });
    let builder = ConfirmationBuilder::new("delete_employee", schema::OWNER);
    let (action, _placeholder) = builder.build(&ctx.user_id, message.clone(), payload.clone());

    Ok(ToolResponse::pending(action.confirmation_id, message, payload))
}

fn execute_update_salary(state: &AppState, ctx: &ToolCallerContext, payload: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    #[derive(Deserialize)]
    struct Payload {
        employee_id: String,
        new_salary: f64,
        originating_user_id: String,
    }
    let parsed: Payload = serde_json::from_value(payload)
        .map_err(|e| ToolServerError::Validation { path: "payload".into(), message: e.to_string() })?;
    require_same_user(ctx, &parsed.originating_user_id)?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let changed = state
        .manager
        .update_salary(&bundle, &parsed.employee_id, parsed.new_salary)
        .map_err(HrError::into_tool_server_error)?;

    if changed == 0 {
        return Err(ToolServerError::NotFound(format!("no employee with id {}", parsed.employee_id)));
    }
    Ok(ToolResponse::success(
        json!({ "employee_id": parsed.employee_id, "new_salary": parsed.new_salary }),
    ))
}

fn execute_delete_employee(state: &AppState, ctx: &ToolCallerContext, payload: Value) -> Result<ToolResponse, ToolServerError> {
    require_write(ctx)?;
    #[derive(Deserialize)]
    struct Payload {
        employee_id: String,
        originating_user_id: String,
    }
    let parsed: Payload = serde_json::from_value(payload)
        .map_err(|e| ToolServerError::Validation { path: "payload".into(), message: e.to_string() })?;
    require_same_user(ctx, &parsed.originating_user_id)?;

    let bundle = SessionVariableBundle::from_caller(ctx);
    let changed = state
        .manager
        .delete_employee(&bundle, &parsed.employee_id)
        .map_err(HrError::into_tool_server_error)?;

    if changed == 0 {
        return Err(ToolServerError::NotFound(format!("no employee with id {}", parsed.employee_id)));
    }
    Ok(ToolResponse::success(json!({ "employee_id": parsed.employee_id, "deleted": true })))
}
