//! Run configuration and result types.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::callback::SharedRunHooks;
use crate::completion::CompletionMode;
use crate::message::Conversation;
use crate::parse::ModelResult;
use crate::usage::Usage;

use super::cancel::CancelSignal;

/// Per-run options passed to [`Runner::run`](super::Runner::run).
#[derive(Clone, Default)]
pub struct RunConfig {
    /// Batched or streaming completions.
    pub mode: CompletionMode,
    /// Overrides the agent's turn budget for this run.
    pub max_turns: Option<usize>,
    /// Stops the run when fired.
    pub cancel: Option<CancelSignal>,
    /// Lifecycle observer.
    pub hooks: Option<SharedRunHooks>,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("mode", &self.mode)
            .field("max_turns", &self.max_turns)
            .field("cancel", &self.cancel)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

impl RunConfig {
    /// Default options: batched completions, the agent's own budget.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the completion mode.
    #[must_use]
    pub const fn mode(mut self, mode: CompletionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(CompletionMode::from_streaming(streaming))`.
    #[must_use]
    pub const fn streaming(self, streaming: bool) -> Self {
        self.mode(CompletionMode::from_streaming(streaming))
    }

    /// Override the turn budget.
    #[must_use]
    pub const fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// Attach a cancellation signal.
    #[must_use]
    pub fn cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Attach lifecycle hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: SharedRunHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

/// One dispatched tool call and what came of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallRecord {
    /// Tool name as requested by the model.
    pub name: String,
    /// Arguments as requested by the model.
    pub arguments: Map<String, Value>,
    /// Tool output on success, the error text on failure.
    pub output: String,
    /// Whether the tool succeeded.
    pub success: bool,
}

/// One completed turn of the loop.
#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
    /// 1-based step number.
    pub step: usize,
    /// Model text after stop-sequence truncation.
    pub raw_text: String,
    /// The parsed result.
    #[serde(serialize_with = "serialize_result")]
    pub result: ModelResult,
    /// Calls dispatched in this step, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Token usage of this step's completion.
    pub usage: Usage,
}

fn serialize_result<S: serde::Serializer>(result: &ModelResult, s: S) -> Result<S::Ok, S::Error> {
    result.to_json().serialize(s)
}

/// Outcome of a run that reached a `stop` result.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The final answer.
    pub output: String,
    /// The explanation attached to the final answer, if any.
    pub explanation: Option<String>,
    /// Full conversation, including every tool-call turn pair. The priming
    /// turn is never part of it.
    pub conversation: Conversation,
    /// Number of completions requested.
    pub steps: usize,
    /// Per-step detail.
    pub step_history: Vec<StepInfo>,
    /// Usage summed over all steps.
    pub usage: Usage,
}

impl RunResult {
    /// Every tool call of the run, in dispatch order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.step_history.iter().flat_map(|s| s.tool_calls.iter())
    }

    /// One-line summary for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} steps, {} tool calls, {}",
            self.steps,
            self.tool_calls().count(),
            self.usage
        )
    }
}
