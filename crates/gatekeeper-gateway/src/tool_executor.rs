use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gatekeeper_contract::{BackendWarning, ClientEvent, PendingAction, ToolDescriptor, ToolKind, ToolResponse};
use gatekeeper_core::error::ErrorCode;
use gatekeeper_core::types::CallerContext;
use gatekeeper_llm::{ToolCall, ToolExecutor, ToolOutcome};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::state::GatewayState;
use crate::tool_client;

/// Drives one caller's tool calls through their owning Tool Server,
/// enforcing the allow-list a second time (the model only ever sees the
/// tools it was offered, but a model can still hallucinate a name), and
/// emitting `event: tool` / `event: pending` to the client as each call
/// resolves (spec §4.1 steps 3-4, §6.4).
pub struct GatewayToolExecutor {
    state: Arc<GatewayState>,
    caller: CallerContext,
    allowed: HashMap<String, ToolDescriptor>,
    client_tx: mpsc::Sender<ClientEvent>,
    warnings: Mutex<Vec<BackendWarning>>,
}

impl GatewayToolExecutor {
    pub fn new(state: Arc<GatewayState>, caller: CallerContext, client_tx: mpsc::Sender<ClientEvent>) -> Self {
        let allowed = state
            .tools
            .iter()
            .filter(|t| t.callable_by(&caller.roles))
            .map(|t| (t.name.clone(), t.clone()))
            .collect();

        Self {
            state,
            caller,
            allowed,
            client_tx,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub async fn take_warnings(&self) -> Vec<BackendWarning> {
        std::mem::take(&mut *self.warnings.lock().await)
    }

    async fn deny(&self, call: &ToolCall, code: ErrorCode, message: &str) -> ToolOutcome {
        let envelope = ToolResponse::error(code, message);
        let _ = self
            .client_tx
            .send(ClientEvent::Tool {
                name: call.name.clone(),
                envelope: envelope.clone(),
            })
            .await;
        ToolOutcome {
            content: serde_json::to_value(&envelope).unwrap_or(Value::Null),
            is_error: true,
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for GatewayToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let Some(descriptor) = self.allowed.get(&call.name) else {
            return self
                .deny(call, ErrorCode::InsufficientPermissions, "tool not in the caller's allow-list")
                .await;
        };

        let Some(endpoint) = self.state.config.tool_servers.iter().find(|e| e.name == descriptor.owner) else {
            return self
                .deny(call, ErrorCode::UpstreamError, "no endpoint configured for this tool's owner")
                .await;
        };

        let timeout = match descriptor.kind {
            ToolKind::Write => Duration::from_secs(self.state.config.timeout.tool_write_secs),
            ToolKind::Read => Duration::from_secs(self.state.config.timeout.tool_read_secs),
        };

        let invocation = tool_client::invoke_tool(
            &self.state.http,
            &endpoint.base_url,
            &call.name,
            call.input.clone(),
            &self.caller,
            timeout,
        )
        .await;

        if let Some((code, message)) = invocation.failed {
            self.warnings.lock().await.push(BackendWarning {
                server: descriptor.owner.clone(),
                code: code.as_str().to_string(),
                message,
            });
        }

        let redacted = invocation.envelope.redact_technical_details();

        if let ToolResponse::PendingConfirmation { confirmation_id, message, data } = &redacted {
            let action = PendingAction {
                confirmation_id: confirmation_id.clone(),
                action_tag: call.name.clone(),
                owner: descriptor.owner.clone(),
                originating_user_id: self.caller.user_id.clone(),
                created_at: Utc::now(),
                payload: data.clone(),
            };
            if let Err(e) = self.state.pending_store.put(&action, self.state.config.pending.ttl_secs).await {
                tracing::warn!(error = %e, confirmation_id, "failed to persist pending action");
            }

            let client_envelope = ToolResponse::pending(confirmation_id.clone(), message.clone(), Value::Null);
            let _ = self
                .client_tx
                .send(ClientEvent::Tool {
                    name: call.name.clone(),
                    envelope: client_envelope,
                })
                .await;
            let _ = self
                .client_tx
                .send(ClientEvent::Pending {
                    confirmation_id: confirmation_id.clone(),
                    message: message.clone(),
                    data: Value::Null,
                })
                .await;

            return ToolOutcome {
                content: serde_json::json!({
                    "status": "pendingConfirmation",
                    "confirmationId": confirmation_id,
                    "message": message,
                }),
                is_error: false,
            };
        }

        let _ = self
            .client_tx
            .send(ClientEvent::Tool {
                name: call.name.clone(),
                envelope: redacted.clone(),
            })
            .await;

        let mut content = serde_json::to_value(&redacted).unwrap_or(Value::Null);
        if redacted.has_more() {
            if let Value::Object(ref mut map) = content {
                map.insert(
                    "systemNote".to_string(),
                    Value::String(
                        "This result was truncated. Call the same tool again with pagination.nextCursor to continue."
                            .to_string(),
                    ),
                );
            }
        }

        let is_error = matches!(redacted, ToolResponse::Error { .. });
        ToolOutcome { content, is_error }
    }
}
