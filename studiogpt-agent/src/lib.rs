pub mod client;
pub mod error;
pub mod guardrails;
pub mod history;
pub mod protocol;

// Re-export key types for convenience.
pub use client::{AgentClient, AgentEvent};
pub use error::{AgentError, Result};
pub use guardrails::{GuardrailViolation, ToolLoopGuard};
pub use history::{AgentMessage, ConversationHistory, MAX_TOOL_RESULT_CHARS};
pub use protocol::{
    ContentPart, FunctionCall, InputItem, OutputContent, OutputItem, ResponseUsage,
    ResponsesReply, ResponsesRequest, StreamEvent, ToolSpec, classify_agent_error,
    process_stream_body,
};
