//! Agent configuration.
//!
//! An [`Agent`] bundles a provider, a tool registry and the prompt and
//! sampling settings. It holds no per-run state, so one agent can serve any
//! number of runs.
//!
//! ```rust,ignore
//! use tooluse::prelude::*;
//!
//! let agent = Agent::new(provider)
//!     .tools(tooluse::tools::full_toolset())
//!     .max_turns(8);
//!
//! let answer = agent.ask("What is 1 + 1?", CompletionMode::Streaming).await?;
//! ```

use std::fmt;

use crate::chat::SharedChatProvider;
use crate::completion::{
    CompletionClient, CompletionMode, OutputFormat, RetryPolicy, SamplingConfig,
};
use crate::error::Result;
use crate::message::Conversation;
use crate::prompt::SystemPrompt;
use crate::tool::{Tool, ToolRegistry};

use super::result::{RunConfig, RunResult};
use super::runner::Runner;

/// Default turn budget.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// A tool-using model and its settings.
pub struct Agent {
    pub(crate) provider: SharedChatProvider,
    pub(crate) model: String,
    pub(crate) tools: ToolRegistry,
    pub(crate) instructions: Option<String>,
    pub(crate) sampling: SamplingConfig,
    pub(crate) format: OutputFormat,
    pub(crate) retry: RetryPolicy,
    pub(crate) max_turns: usize,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.model)
            .field("tools", &self.tools)
            .field("max_turns", &self.max_turns)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create an agent using the provider's default model and no tools.
    #[must_use]
    pub fn new(provider: SharedChatProvider) -> Self {
        Self {
            provider,
            model: String::new(),
            tools: ToolRegistry::new(),
            instructions: None,
            sampling: SamplingConfig::default(),
            format: OutputFormat::default(),
            retry: RetryPolicy::default(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Set the model name. Empty means the provider default.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the tool registry.
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Register one more tool.
    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.add(tool);
        self
    }

    /// Extra system prompt text, appended after the tool section.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set sampling parameters.
    #[must_use]
    pub const fn sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the priming turn and stop sequence.
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the transport retry policy.
    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the default turn budget.
    #[must_use]
    pub const fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// The tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The configured turn budget.
    #[must_use]
    pub const fn turn_budget(&self) -> usize {
        self.max_turns
    }

    /// Render the system prompt for the current tools and instructions.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        let mut prompt = SystemPrompt::new(&self.tools.definitions());
        if let Some(extra) = &self.instructions {
            prompt = prompt.with_instructions(extra);
        }
        prompt.render()
    }

    /// Build the completion client for one run.
    #[must_use]
    pub fn completion_client(&self) -> CompletionClient {
        CompletionClient::new(self.provider.clone(), &self.model)
            .with_system_prompt(self.system_prompt())
            .with_sampling(self.sampling)
            .with_format(self.format.clone())
            .with_retry(self.retry)
    }

    /// Run the loop on an initial conversation.
    ///
    /// # Errors
    ///
    /// See [`Runner::run`].
    pub async fn run(
        &self,
        conversation: impl Into<Conversation>,
        config: RunConfig,
    ) -> Result<RunResult> {
        Runner::run(self, conversation.into(), config).await
    }

    /// Ask one question and return the final answer.
    ///
    /// # Errors
    ///
    /// See [`Runner::run`].
    pub async fn ask(&self, question: &str, mode: CompletionMode) -> Result<String> {
        let result = self.run(question, RunConfig::new().mode(mode)).await?;
        Ok(result.output)
    }
}
