pub mod anthropic;
pub mod provider;
pub mod sse;
pub mod tool_loop;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use provider::{LlmProvider, ProviderError};
pub use tool_loop::{run_tool_loop, ToolExecutor, ToolOutcome, MAX_ITERATIONS};
pub use types::{ChatRequest, ChatResponse, Message, Role, StreamEvent, ToolCall, ToolDefinition};
