//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use tooluse::prelude::*;
//! ```

#[cfg(feature = "anthropic")]
pub use crate::llms::{Anthropic, AnthropicConfig};
pub use crate::llms::{ScriptedProvider, ScriptedReply};

pub use crate::agent::{
    Agent, CancelSignal, RunConfig, RunResult, Runner, StepInfo, ToolCallRecord,
};
pub use crate::callback::{LoggingRunHooks, NoopRunHooks, RunHooks, SharedRunHooks};
pub use crate::error::{Error, LlmError, Result, ToolError};

pub use crate::chat::{ChatProvider, ChatRequest, ChatResponse, SharedChatProvider};
pub use crate::completion::{
    Completion, CompletionClient, CompletionMode, OutputFormat, RetryPolicy, SamplingConfig,
};
pub use crate::message::{Conversation, Role, Turn};
pub use crate::parse::{ModelResult, ParseError, ToolCall, parse_model_output};
pub use crate::prompt::SystemPrompt;
pub use crate::stream::{StopReason, StreamAggregator, StreamChunk};
pub use crate::tool::{FunctionTool, Tool, ToolArgs, ToolDefinition, ToolRegistry, ToolResult, TypedTool};
pub use crate::usage::Usage;
