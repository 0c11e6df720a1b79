use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::Stream;
use gatekeeper_contract::{ClientEvent, ToolDescriptor};
use gatekeeper_llm::{run_tool_loop, ChatRequest, Message, Role, StreamEvent, ToolDefinition};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::AuthenticatedCaller;
use crate::ratelimit;
use crate::state::GatewayState;
use crate::system_prompt;
use crate::tool_executor::GatewayToolExecutor;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

/// Drops the correlation id's cancellation token (and the `active_queries`
/// entry) the moment the client stream is torn down — whether that's a
/// normal `done` or the client disconnecting mid-turn (spec §4.3
/// "Suspension points": a disconnect must cancel outstanding tool calls
/// and close the LLM stream).
struct QueryGuard {
    token: CancellationToken,
    correlation_id: String,
    state: Arc<GatewayState>,
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        self.token.cancel();
        self.state.active_queries.remove(&self.correlation_id);
    }
}

/// POST /query — spec §4.1 "Streaming query loop". Builds the tool
/// allow-list and system prompt for this caller, then drives the model's
/// tool-calling loop while forwarding every client-visible event as SSE.
pub async fn query(
    State(state): State<Arc<GatewayState>>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<Value>)> {
    ratelimit::check(&state.general_limiter, &caller.user_id)?;
    ratelimit::check(&state.query_limiter, &caller.user_id)?;

    let correlation_id = Uuid::new_v4().to_string();
    let cancel = CancellationToken::new();
    state.active_queries.insert(correlation_id.clone(), cancel.clone());

    let allowed: Vec<&ToolDescriptor> = state.tools.iter().filter(|t| t.callable_by(&caller.roles)).collect();
    let system = system_prompt::build(&allowed);
    let tools: Vec<ToolDefinition> = allowed
        .iter()
        .map(|t| ToolDefinition {
            name: t.name.clone(),
            description: format!("Tool owned by the {} backend.", t.owner),
            input_schema: t.input_schema.clone(),
        })
        .collect();

    let mut messages: Vec<Message> = body
        .conversation
        .iter()
        .map(|turn| Message {
            role: match turn.role.as_str() {
                "assistant" => Role::Assistant,
                "system" => Role::System,
                _ => Role::User,
            },
            content: turn.content.clone(),
        })
        .collect();
    messages.push(Message {
        role: Role::User,
        content: body.query.clone(),
    });

    let request = ChatRequest {
        model: state.config.llm.model.clone(),
        system,
        messages,
        max_tokens: 4096,
        tools,
        raw_messages: None,
    };

    let (client_tx, mut client_rx) = mpsc::channel::<ClientEvent>(64);
    let (loop_tx, mut loop_rx) = mpsc::channel::<StreamEvent>(64);

    let executor = Arc::new(GatewayToolExecutor::new(state.clone(), caller, client_tx.clone()));

    let task_state = state.clone();
    let task_cancel = cancel.clone();
    let task_executor = executor.clone();
    let task_client_tx = client_tx.clone();
    let task_correlation_id = correlation_id.clone();

    tokio::spawn(async move {
        let total_timeout = Duration::from_secs(task_state.config.timeout.request_total_secs);
        let drain_client_tx = task_client_tx.clone();

        let run_executor = task_executor.clone();
        let run = async move {
            let loop_future = run_tool_loop(&task_state.llm, request, run_executor.as_ref(), loop_tx);
            let drain_future = async move {
                while let Some(event) = loop_rx.recv().await {
                    match event {
                        StreamEvent::TextDelta { text } => {
                            let _ = drain_client_tx.send(ClientEvent::Text { delta: text }).await;
                        }
                        StreamEvent::Error { message } => {
                            let _ = drain_client_tx
                                .send(ClientEvent::Error {
                                    code: "UPSTREAM_ERROR".to_string(),
                                    message,
                                })
                                .await;
                        }
                        StreamEvent::ToolUse { .. } | StreamEvent::Done { .. } => {}
                    }
                }
            };
            let (result, _) = tokio::join!(loop_future, drain_future);
            result
        };

        tokio::select! {
            _ = task_cancel.cancelled() => {
                tracing::debug!(correlation_id = %task_correlation_id, "query cancelled");
            }
            outcome = tokio::time::timeout(total_timeout, run) => {
                match outcome {
                    Err(_) => {
                        let _ = task_client_tx
                            .send(ClientEvent::Error {
                                code: "REQUEST_TIMEOUT".to_string(),
                                message: "query exceeded the maximum request duration".to_string(),
                            })
                            .await;
                    }
                    Ok(Err(e)) => {
                        let _ = task_client_tx
                            .send(ClientEvent::Error {
                                code: "UPSTREAM_ERROR".to_string(),
                                message: e.to_string(),
                            })
                            .await;
                    }
                    Ok(Ok(())) => {}
                }
            }
        }

        let warnings = task_executor.take_warnings().await;
        if !warnings.is_empty() {
            let _ = task_client_tx.send(ClientEvent::Warnings { items: warnings }).await;
        }
        let _ = task_client_tx.send(ClientEvent::Done {}).await;
    });

    let stream_correlation_id = correlation_id.clone();
    let stream = async_stream::stream! {
        let _guard = QueryGuard { token: cancel, correlation_id, state };
        yield Ok(to_sse_event(&ClientEvent::Connected { correlation_id: stream_correlation_id }));
        while let Some(event) = client_rx.recv().await {
            yield Ok(to_sse_event(&event));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &ClientEvent) -> Event {
    Event::default().event(event.event_name()).data(event.data_json().to_string())
}
