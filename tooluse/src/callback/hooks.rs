//! Run lifecycle hook trait.
//!
//! [`RunHooks`] uses `async_trait` for object safety (`dyn RunHooks`) and
//! provides a default no-op for every method, so implementations only
//! override the events they care about.
//!
//! # Lifecycle Events
//!
//! 1. **`on_run_start`**: the orchestrator received its initial conversation
//! 2. **Turn loop** (repeats until `stop`):
//!    - `on_completion_start` → *completion* (`on_text_delta` per fragment when
//!      streaming, `on_completion_retry` before each retried attempt) →
//!      `on_completion_end`
//!    - `on_tool_start` → *dispatch* → `on_tool_end`, once per requested call
//! 3. **`on_run_end`** with the final answer, or **`on_error`** on failure

use async_trait::async_trait;

use crate::agent::ToolCallRecord;
use crate::completion::Completion;
use crate::error::{Error, LlmError};
use crate::message::{Conversation, Turn};
use crate::parse::ToolCall;

/// A shared, thread-safe [`RunHooks`] trait object.
pub type SharedRunHooks = std::sync::Arc<dyn RunHooks>;

/// Observer for one orchestration run.
#[async_trait]
pub trait RunHooks: Send + Sync {
    /// Called once before the first completion.
    async fn on_run_start(&self, _conversation: &Conversation) {}

    /// Called before each completion request.
    ///
    /// `messages` is the conversation as sent, without the priming turn.
    async fn on_completion_start(&self, _step: usize, _messages: &[Turn]) {}

    /// Called for every text fragment of a streamed completion.
    async fn on_text_delta(&self, _delta: &str) {}

    /// Called when an attempt failed with a retryable error and the request
    /// is about to be resent. Text deltas already delivered for the failed
    /// attempt are discarded; the next attempt streams from the start.
    async fn on_completion_retry(&self, _attempt: u32, _error: &LlmError) {}

    /// Called after a completion returns, before it is parsed.
    async fn on_completion_end(&self, _step: usize, _completion: &Completion) {}

    /// Called immediately before a tool call is dispatched.
    async fn on_tool_start(&self, _step: usize, _call: &ToolCall) {}

    /// Called after a tool call finished, successfully or not.
    async fn on_tool_end(&self, _step: usize, _record: &ToolCallRecord) {}

    /// Called once with the final answer.
    async fn on_run_end(&self, _output: &str, _steps: usize) {}

    /// Called when the run fails.
    async fn on_error(&self, _error: &Error) {}
}
