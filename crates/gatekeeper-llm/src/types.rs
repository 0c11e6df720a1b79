use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Tool definition as sent to the model in a chat request — projected from
/// a [`gatekeeper_contract::ToolDescriptor`] by the gateway's discovery
/// step, stripped of everything the model doesn't need (owner, required
/// roles, destructive flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool call extracted from a model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub tools: Vec<ToolDefinition>,
    /// Raw JSON message history used once the tool loop starts building
    /// `tool_use`/`tool_result` content blocks that don't fit the plain
    /// `Message` shape. Overrides `messages` when set.
    pub raw_messages: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Events emitted while streaming a single model turn.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    Done {
        model: String,
        tokens_in: u32,
        tokens_out: u32,
        stop_reason: String,
    },
    Error { message: String },
}
