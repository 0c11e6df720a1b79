use serde::{Deserialize, Serialize};

use gatekeeper_core::error::ErrorCode;

/// Pagination metadata attached to a successful list response.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PageMeta {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub returned_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Legacy alias carried alongside `has_more`/`next_cursor` for one
    /// release per spec §9's note on the v1.3/v1.4 pagination overlap.
    /// Populated only when the tool chooses to; the Gateway never requires it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

/// The uniform three-variant response envelope every Tool Server returns
/// (spec §3). Tagged so a bare payload or a fourth variant is a compile-time
/// impossibility, not merely a runtime validation concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ToolResponse {
    #[serde(rename = "success")]
    Success {
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pagination: Option<PageMeta>,
    },
    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggested_action: Option<String>,
        /// Logged with the correlation id, never forwarded to the LLM or
        /// the client (spec §7). Callers building a client-facing or
        /// LLM-facing view of this envelope must use
        /// [`ToolResponse::redact_technical_details`].
        #[serde(default, skip_serializing_if = "Option::is_none")]
        technical_details: Option<String>,
    },
    #[serde(rename = "pendingConfirmation")]
    PendingConfirmation {
        confirmation_id: String,
        message: String,
        /// Opaque to the Gateway; always includes the originating user id
        /// (spec §3) so `/execute` can re-verify ownership.
        data: serde_json::Value,
    },
}

impl ToolResponse {
    pub fn success(data: serde_json::Value) -> Self {
        ToolResponse::Success {
            data,
            pagination: None,
        }
    }

    pub fn success_paginated(data: serde_json::Value, pagination: PageMeta) -> Self {
        ToolResponse::Success {
            data,
            pagination: Some(pagination),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ToolResponse::Error {
            code: code.as_str().to_string(),
            message: message.into(),
            suggested_action: None,
            technical_details: None,
        }
    }

    pub fn error_with_details(
        code: ErrorCode,
        message: impl Into<String>,
        technical_details: impl Into<String>,
    ) -> Self {
        ToolResponse::Error {
            code: code.as_str().to_string(),
            message: message.into(),
            suggested_action: None,
            technical_details: Some(technical_details.into()),
        }
    }

    pub fn pending(
        confirmation_id: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        ToolResponse::PendingConfirmation {
            confirmation_id: confirmation_id.into(),
            message: message.into(),
            data,
        }
    }

    pub fn has_more(&self) -> bool {
        matches!(
            self,
            ToolResponse::Success {
                pagination: Some(p),
                ..
            } if p.has_more
        )
    }

    /// A view of this envelope with `technicalDetails` stripped — the only
    /// form that may be re-injected into the LLM stream or sent to the
    /// client (spec §7 invariant).
    pub fn redact_technical_details(&self) -> ToolResponse {
        match self {
            ToolResponse::Error {
                code,
                message,
                suggested_action,
                ..
            } => ToolResponse::Error {
                code: code.clone(),
                message: message.clone(),
                suggested_action: suggested_action.clone(),
                technical_details: None,
            },
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_with_status_tag() {
        let env = ToolResponse::success(serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains(r#""status":"success""#));
    }

    #[test]
    fn error_omits_technical_details_when_absent() {
        let env = ToolResponse::error(ErrorCode::NotFound, "nope");
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("technicalDetails"));
    }

    #[test]
    fn redact_strips_technical_details_but_keeps_message() {
        let env = ToolResponse::error_with_details(ErrorCode::DatabaseError, "failed", "conn refused at 10.0.0.1:5432");
        let redacted = env.redact_technical_details();
        let json = serde_json::to_string(&redacted).unwrap();
        assert!(!json.contains("10.0.0.1"));
        assert!(json.contains("failed"));
    }

    #[test]
    fn pending_round_trips_through_json() {
        let env = ToolResponse::pending("abc-123", "delete Bob?", serde_json::json!({"user_id": "u1"}));
        let json = serde_json::to_string(&env).unwrap();
        let back: ToolResponse = serde_json::from_str(&json).unwrap();
        match back {
            ToolResponse::PendingConfirmation { confirmation_id, .. } => {
                assert_eq!(confirmation_id, "abc-123");
            }
            _ => panic!("expected pendingConfirmation"),
        }
    }
}
