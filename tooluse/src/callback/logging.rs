//! Tracing-based [`RunHooks`] implementation.
//!
//! [`LoggingRunHooks`] emits one structured event per lifecycle hook, which
//! mirrors the prints a hand-driven loop would make: each model turn, each
//! tool invocation and its result.
//!
//! ```rust,ignore
//! use tooluse::callback::{LoggingRunHooks, LogLevel};
//!
//! let hooks = LoggingRunHooks::with_level(LogLevel::Debug);
//! ```

use async_trait::async_trait;

use crate::agent::ToolCallRecord;
use crate::completion::Completion;
use crate::error::{Error, LlmError};
use crate::message::{Conversation, Turn};
use crate::parse::ToolCall;

use super::hooks::RunHooks;

/// Log verbosity level for hook events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace-level logging (most verbose).
    Trace,
    /// Debug-level logging.
    Debug,
    /// Info-level logging (default).
    #[default]
    Info,
    /// Warn-level logging.
    Warn,
}

macro_rules! log_at_level {
    ($level:expr, $($arg:tt)*) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)*),
            LogLevel::Debug => tracing::debug!($($arg)*),
            LogLevel::Info  => tracing::info!($($arg)*),
            LogLevel::Warn  => tracing::warn!($($arg)*),
        }
    };
}

/// A [`RunHooks`] implementation that logs lifecycle events via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRunHooks {
    level: LogLevel,
}

impl LoggingRunHooks {
    /// Create logging hooks at INFO level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create logging hooks with a custom log level.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }

    /// The configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

#[async_trait]
impl RunHooks for LoggingRunHooks {
    async fn on_run_start(&self, conversation: &Conversation) {
        log_at_level!(self.level, turns = conversation.len(), "Run started");
    }

    async fn on_completion_start(&self, step: usize, messages: &[Turn]) {
        log_at_level!(
            self.level,
            step,
            message_count = messages.len(),
            "Completion requested"
        );
    }

    async fn on_completion_retry(&self, attempt: u32, error: &LlmError) {
        log_at_level!(self.level, attempt, error = %error, "Completion retrying");
    }

    async fn on_completion_end(&self, step: usize, completion: &Completion) {
        log_at_level!(self.level,
            step,
            stop_reason = ?completion.stop_reason,
            usage = %completion.usage,
            text = %completion.text,
            "Completion received"
        );
    }

    async fn on_tool_start(&self, step: usize, call: &ToolCall) {
        log_at_level!(self.level,
            step,
            tool = %call.name,
            args = %call.arguments_json(),
            "Tool call started"
        );
    }

    async fn on_tool_end(&self, step: usize, record: &ToolCallRecord) {
        log_at_level!(self.level,
            step,
            tool = %record.name,
            success = record.success,
            output = %record.output,
            "Tool call finished"
        );
    }

    async fn on_run_end(&self, output: &str, steps: usize) {
        log_at_level!(self.level, steps, output, "Run completed");
    }

    async fn on_error(&self, error: &Error) {
        // Errors always log at WARN regardless of configured level.
        tracing::warn!(error = %error, "Run failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::usage::Usage;
    use serde_json::Map;

    #[test]
    fn default_is_info() {
        assert_eq!(LoggingRunHooks::new().level(), LogLevel::Info);
        assert_eq!(
            LoggingRunHooks::with_level(LogLevel::Trace).level(),
            LogLevel::Trace
        );
    }

    #[tokio::test]
    async fn every_hook_runs_at_every_level() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
        ] {
            let hooks = LoggingRunHooks::with_level(level);
            let call = ToolCall::new("get_current_location", Map::new());
            hooks.on_run_start(&Conversation::from("q")).await;
            hooks.on_completion_start(1, &[Turn::user("q")]).await;
            hooks
                .on_completion_end(
                    1,
                    &Completion {
                        text: "{}".into(),
                        stop_reason: None,
                        usage: Usage::new(1, 1),
                    },
                )
                .await;
            hooks
                .on_completion_retry(1, &LlmError::network("reset"))
                .await;
            hooks.on_tool_start(1, &call).await;
            hooks
                .on_tool_end(
                    1,
                    &ToolCallRecord {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                        output: "Guangzhou".into(),
                        success: true,
                    },
                )
                .await;
            hooks.on_run_end("answer", 2).await;
            hooks.on_error(&Error::cancelled(None)).await;
        }
    }
}
