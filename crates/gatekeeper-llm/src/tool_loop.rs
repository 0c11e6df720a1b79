use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::provider::{LlmProvider, ProviderError};
use crate::types::{ChatRequest, StreamEvent, ToolCall};

/// Maximum tool loop iterations per `/query` turn, preventing a
/// misbehaving model from looping forever (spec §4.3).
pub const MAX_ITERATIONS: usize = 25;

/// The result of invoking one tool call, fed back into the conversation
/// as a `tool_result` content block.
pub struct ToolOutcome {
    pub content: serde_json::Value,
    pub is_error: bool,
}

/// Executes a single tool call against whatever backend resolved it — the
/// gateway's implementation dispatches to the owning Tool Server over
/// HTTP, enforces the allow-list, timeouts, and the confirmation flow;
/// this trait only describes the shape the loop needs.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> ToolOutcome;
}

/// Drives a streaming agentic turn: stream the model's response, and each
/// time it stops to call tools, execute them through `executor` and feed
/// the results back for another turn. Forwards every `StreamEvent` the
/// model itself produces to `tx` as it arrives; tool execution happens
/// between turns, not inside a single stream.
pub async fn run_tool_loop(
    provider: &dyn LlmProvider,
    initial_request: ChatRequest,
    executor: &dyn ToolExecutor,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<(), ProviderError> {
    let mut raw_messages: Vec<serde_json::Value> =
        if let Some(ref raw) = initial_request.raw_messages {
            raw.clone()
        } else {
            initial_request
                .messages
                .iter()
                .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
                .collect()
        };

    for iteration in 0..MAX_ITERATIONS {
        let mut req = initial_request.clone();
        req.raw_messages = Some(raw_messages.clone());

        debug!(iteration, "tool loop iteration");

        let (turn_tx, mut turn_rx) = mpsc::channel(64);
        let send_task = provider.send_stream(&req, turn_tx);

        let mut text_parts = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut stop_reason = String::new();
        let mut saw_error = false;

        let drain = async {
            while let Some(event) = turn_rx.recv().await {
                match &event {
                    StreamEvent::TextDelta { text } => text_parts.push(text.clone()),
                    StreamEvent::ToolUse { id, name, input } => {
                        tool_calls.push(ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            input: input.clone(),
                        });
                    }
                    StreamEvent::Done { stop_reason: sr, .. } => stop_reason = sr.clone(),
                    StreamEvent::Error { .. } => saw_error = true,
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        };

        let (send_result, _) = tokio::join!(send_task, drain);
        send_result?;

        if saw_error {
            return Ok(());
        }

        if tool_calls.is_empty() || stop_reason != "tool_use" {
            info!(iteration, "tool loop complete, no further tool calls");
            return Ok(());
        }

        let mut assistant_content: Vec<serde_json::Value> = Vec::new();
        let joined_text = text_parts.join("");
        if !joined_text.is_empty() {
            assistant_content.push(serde_json::json!({ "type": "text", "text": joined_text }));
        }
        for call in &tool_calls {
            assistant_content.push(serde_json::json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.name,
                "input": call.input,
            }));
        }
        raw_messages.push(serde_json::json!({ "role": "assistant", "content": assistant_content }));

        let mut tool_result_content = Vec::new();
        for call in &tool_calls {
            let outcome = executor.execute(call).await;
            tool_result_content.push(serde_json::json!({
                "type": "tool_result",
                "tool_use_id": call.id,
                "content": outcome.content,
                "is_error": outcome.is_error,
            }));
        }
        raw_messages.push(serde_json::json!({ "role": "user", "content": tool_result_content }));
    }

    warn!(max_iterations = MAX_ITERATIONS, "tool loop hit maximum iterations");
    let _ = tx
        .send(StreamEvent::Error {
            message: format!("tool loop exceeded {MAX_ITERATIONS} iterations"),
        })
        .await;
    Ok(())
}
