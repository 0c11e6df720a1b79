use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::provider::{LlmProvider, ProviderError};
use crate::sse::{parse_sse_line, SseParsed};
use crate::types::{ChatRequest, ChatResponse, StreamEvent, ToolCall};

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("x-api-key", &self.api_key)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req, false);
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %req.model, "sending request to anthropic");

        let builder = self
            .client
            .post(&url)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let resp = self.apply_auth(builder).send().await?;
        let status = resp.status().as_u16();

        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "anthropic api error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parse_response(api_resp))
    }

    async fn send_stream(
        &self,
        req: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let body = build_request_body(req, true);
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %req.model, "sending streaming request to anthropic");

        let builder = self
            .client
            .post(&url)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let resp = self.apply_auth(builder).send().await?;
        let status = resp.status().as_u16();

        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "anthropic streaming api error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        process_stream(resp, tx).await;
        Ok(())
    }
}

fn build_request_body(req: &ChatRequest, stream: bool) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = if let Some(ref raw) = req.raw_messages {
        raw.clone()
    } else {
        req.messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect()
    };

    let mut body = serde_json::json!({
        "model": req.model,
        "max_tokens": req.max_tokens,
        "system": req.system,
        "messages": messages,
        "stream": stream,
    });

    if !req.tools.is_empty() {
        let tools: Vec<serde_json::Value> = req
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.input_schema,
                })
            })
            .collect();
        body["tools"] = serde_json::Value::Array(tools);
    }

    body
}

/// Parse the Anthropic streaming SSE body and forward decoded events to
/// `tx`. Accumulates `content_block_delta` fragments per block and emits a
/// single `ToolUse` once a `tool_use` block closes.
async fn process_stream(resp: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut current_event = String::new();
    let mut current_block_type = String::new();
    let mut tool_use_id = String::new();
    let mut tool_use_name = String::new();
    let mut tool_use_input_json = String::new();
    let mut model = String::new();
    let mut tokens_in: u32 = 0;
    let mut tokens_out: u32 = 0;
    let mut stop_reason = String::new();
    let mut line_buf = String::new();

    let mut byte_stream = resp.bytes_stream();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        let Ok(text) = std::str::from_utf8(&chunk) else {
            continue;
        };

        line_buf.push_str(text);
        let lines: Vec<&str> = line_buf.split('\n').collect();
        let (complete, remainder) = lines.split_at(lines.len() - 1);
        let remainder = remainder.first().unwrap_or(&"").to_string();

        for line in complete {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(parsed) = parse_sse_line(line) else {
                continue;
            };

            match parsed {
                SseParsed::Event(ev) => current_event = ev,
                SseParsed::Data(data) => {
                    if let Some(event) = parse_data_block(
                        &current_event,
                        &data,
                        &mut current_block_type,
                        &mut tool_use_id,
                        &mut tool_use_name,
                        &mut tool_use_input_json,
                        &mut model,
                        &mut tokens_in,
                        &mut tokens_out,
                        &mut stop_reason,
                    ) {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }

        line_buf = remainder;
    }
}

#[allow(clippy::too_many_arguments)]
fn parse_data_block(
    event: &str,
    data: &str,
    current_block_type: &mut String,
    tool_use_id: &mut String,
    tool_use_name: &mut String,
    tool_use_input_json: &mut String,
    model: &mut String,
    tokens_in: &mut u32,
    tokens_out: &mut u32,
    stop_reason: &mut String,
) -> Option<StreamEvent> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;

    match event {
        "message_start" => {
            *model = value
                .pointer("/message/model")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            *tokens_in = value
                .pointer("/message/usage/input_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32;
            None
        }
        "content_block_start" => {
            let block = value.get("content_block")?;
            *current_block_type = block.get("type").and_then(|v| v.as_str())?.to_string();
            if current_block_type == "tool_use" {
                *tool_use_id = block.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
                *tool_use_name = block
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                tool_use_input_json.clear();
            }
            None
        }
        "content_block_delta" => {
            let delta = value.get("delta")?;
            match delta.get("type").and_then(|v| v.as_str())? {
                "text_delta" => {
                    let text = delta.get("text").and_then(|v| v.as_str())?.to_string();
                    Some(StreamEvent::TextDelta { text })
                }
                "input_json_delta" => {
                    if let Some(partial) = delta.get("partial_json").and_then(|v| v.as_str()) {
                        tool_use_input_json.push_str(partial);
                    }
                    None
                }
                _ => None,
            }
        }
        "content_block_stop" => {
            if current_block_type == "tool_use" {
                let input: serde_json::Value = serde_json::from_str(tool_use_input_json)
                    .unwrap_or(serde_json::Value::Object(Default::default()));
                let event = StreamEvent::ToolUse {
                    id: tool_use_id.clone(),
                    name: tool_use_name.clone(),
                    input,
                };
                current_block_type.clear();
                return Some(event);
            }
            None
        }
        "message_delta" => {
            if let Some(sr) = value.pointer("/delta/stop_reason").and_then(|v| v.as_str()) {
                *stop_reason = sr.to_string();
            }
            if let Some(out) = value
                .pointer("/usage/output_tokens")
                .and_then(|v| v.as_u64())
            {
                *tokens_out = out as u32;
            }
            None
        }
        "message_stop" => Some(StreamEvent::Done {
            model: model.clone(),
            tokens_in: *tokens_in,
            tokens_out: *tokens_out,
            stop_reason: stop_reason.clone(),
        }),
        "error" => {
            let message = value
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown upstream error")
                .to_string();
            Some(StreamEvent::Error { message })
        }
        _ => None,
    }
}

fn parse_response(resp: ApiResponse) -> ChatResponse {
    let mut text_parts: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    for block in resp.content {
        match block {
            ContentBlock::Text { text } => text_parts.push(text),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall { id, name, input });
            }
            ContentBlock::Other => {}
        }
    }

    ChatResponse {
        content: text_parts.join(""),
        model: resp.model,
        tokens_in: resp.usage.input_tokens,
        tokens_out: resp.usage.output_tokens,
        stop_reason: resp.stop_reason.unwrap_or_default(),
        tool_calls,
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}
