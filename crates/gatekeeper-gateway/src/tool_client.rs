use std::time::Duration;

use gatekeeper_contract::ToolResponse;
use gatekeeper_core::error::ErrorCode;
use gatekeeper_core::types::CallerContext;
use tracing::warn;

/// Outcome of one tool invocation against its owning Tool Server,
/// including whether the call failed in a way that should also surface
/// as a `warnings` entry (spec §5 "Partial-failure aggregation").
pub struct ToolInvocation {
    pub envelope: ToolResponse,
    pub failed: Option<(ErrorCode, String)>,
}

/// POSTs tool arguments to `{base_url}/tools/{name}`, attaching the caller
/// context as headers (spec §4.1 "Tool invocation") and bounding the call
/// with `timeout`. Non-2xx, a malformed envelope, or a timed-out call are
/// all synthesized into an *error* envelope here — the caller never sees
/// a bare HTTP failure (spec §3 "a bare payload... is a protocol
/// violation").
pub async fn invoke_tool(
    http: &reqwest::Client,
    base_url: &str,
    tool_name: &str,
    args: serde_json::Value,
    caller: &CallerContext,
    timeout: Duration,
) -> ToolInvocation {
    post_envelope(http, &format!("{base_url}/tools/{tool_name}"), args, caller, timeout).await
}

/// POSTs the stored confirmation payload to `{base_url}/execute`
/// (spec §4.1 "Confirmation execution" step 4).
pub async fn invoke_execute(
    http: &reqwest::Client,
    base_url: &str,
    payload: serde_json::Value,
    caller: &CallerContext,
    timeout: Duration,
) -> ToolInvocation {
    post_envelope(http, &format!("{base_url}/execute"), payload, caller, timeout).await
}

async fn post_envelope(
    http: &reqwest::Client,
    url: &str,
    body: serde_json::Value,
    caller: &CallerContext,
    timeout: Duration,
) -> ToolInvocation {
    let request = http
        .post(url)
        .header("x-caller-id", &caller.user_id)
        .header("x-caller-roles", caller.roles_csv())
        .header(
            "x-caller-email",
            caller.email.clone().unwrap_or_default(),
        )
        .header(
            "x-caller-department",
            caller.department.clone().unwrap_or_default(),
        )
        .json(&body);

    let result = tokio::time::timeout(timeout, request.send()).await;

    match result {
        Err(_) => {
            warn!(url, "tool server call timed out");
            let message = "the backend did not respond in time".to_string();
            ToolInvocation {
                envelope: ToolResponse::error(ErrorCode::Timeout, &message),
                failed: Some((ErrorCode::Timeout, message)),
            }
        }
        Ok(Err(e)) => {
            warn!(url, error = %e, "tool server call failed");
            let message = "the backend is unavailable".to_string();
            ToolInvocation {
                envelope: ToolResponse::error_with_details(ErrorCode::UpstreamError, &message, e.to_string()),
                failed: Some((ErrorCode::UpstreamError, message)),
            }
        }
        Ok(Ok(resp)) if !resp.status().is_success() => {
            let status = resp.status();
            warn!(url, %status, "tool server returned non-2xx");
            let message = "the backend reported an error".to_string();
            ToolInvocation {
                envelope: ToolResponse::error_with_details(
                    ErrorCode::UpstreamError,
                    &message,
                    format!("status {status}"),
                ),
                failed: Some((ErrorCode::UpstreamError, message)),
            }
        }
        Ok(Ok(resp)) => match resp.json::<ToolResponse>().await {
            Ok(envelope) => {
                let failed = match &envelope {
                    ToolResponse::Error { code, message, .. } => {
                        parse_code(code).map(|c| (c, message.clone()))
                    }
                    _ => None,
                };
                ToolInvocation { envelope, failed }
            }
            Err(e) => {
                warn!(url, error = %e, "tool server returned a malformed envelope");
                let message = "the backend returned a malformed response".to_string();
                ToolInvocation {
                    envelope: ToolResponse::error_with_details(
                        ErrorCode::ProtocolViolation,
                        &message,
                        e.to_string(),
                    ),
                    failed: Some((ErrorCode::ProtocolViolation, message)),
                }
            }
        },
    }
}

fn parse_code(raw: &str) -> Option<ErrorCode> {
    match raw {
        "UNAUTHORIZED" => Some(ErrorCode::Unauthorized),
        "INSUFFICIENT_PERMISSIONS" => Some(ErrorCode::InsufficientPermissions),
        "INVALID_CONTEXT" => Some(ErrorCode::InvalidContext),
        "VALIDATION_ERROR" => Some(ErrorCode::ValidationError),
        "NOT_FOUND" => Some(ErrorCode::NotFound),
        "INVALID_CURSOR" => Some(ErrorCode::InvalidCursor),
        "TIMEOUT" => Some(ErrorCode::Timeout),
        "UPSTREAM_ERROR" => Some(ErrorCode::UpstreamError),
        "PROTOCOL_VIOLATION" => Some(ErrorCode::ProtocolViolation),
        "CONFIRMATION_EXPIRED" => Some(ErrorCode::ConfirmationExpired),
        "USER_MISMATCH" => Some(ErrorCode::UserMismatch),
        "REQUEST_TIMEOUT" => Some(ErrorCode::RequestTimeout),
        "RATE_LIMITED" => Some(ErrorCode::RateLimited),
        "DATABASE_ERROR" => Some(ErrorCode::DatabaseError),
        "OPERATION_FAILED" => Some(ErrorCode::OperationFailed),
        _ => None,
    }
}
