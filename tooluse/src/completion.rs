//! Completion client: one model turn, batched or streamed.
//!
//! [`CompletionClient`] shapes every request the same way:
//!
//! 1. the system prompt,
//! 2. every turn of the conversation, in order,
//! 3. a synthetic assistant *priming turn* (by default
//!    `Here is the result in JSON: <json>`) that the model continues from,
//! 4. the stop sequence `</json>` so generation ends with the document.
//!
//! The priming turn exists only inside the request; it is never written back
//! into the [`Conversation`]. Both modes return the same [`Completion`] for
//! the same provider output.

use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::callback::RunHooks;
use crate::chat::{ChatRequest, ChatResponse, DEFAULT_MAX_TOKENS, SharedChatProvider};
use crate::error::{Error, Result};
use crate::message::Conversation;
use crate::stream::{StopReason, StreamAggregator, StreamChunk};
use crate::usage::Usage;

/// Default priming text.
pub const DEFAULT_PREFILL: &str = "Here is the result in JSON: <json>";

/// Default stop sequence.
pub const DEFAULT_STOP_SEQUENCE: &str = "</json>";

/// How the model is coaxed into emitting exactly one JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    /// Text of the synthetic assistant turn appended to every request.
    pub prefill: String,
    /// Generation stops when the model emits this.
    pub stop_sequence: String,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            prefill: DEFAULT_PREFILL.to_owned(),
            stop_sequence: DEFAULT_STOP_SEQUENCE.to_owned(),
        }
    }
}

impl OutputFormat {
    /// Set the priming text. An empty string disables the priming turn.
    #[must_use]
    pub fn with_prefill(mut self, prefill: impl Into<String>) -> Self {
        self.prefill = prefill.into();
        self
    }

    /// Set the stop sequence. An empty string disables it.
    #[must_use]
    pub fn with_stop_sequence(mut self, stop: impl Into<String>) -> Self {
        self.stop_sequence = stop.into();
        self
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    /// Sampling temperature. Zero keeps the output format stable.
    pub temperature: f32,
    /// Generation cap per completion.
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Whether a completion is requested in one piece or incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Single request, single response.
    #[default]
    Batched,
    /// Server-sent fragments, forwarded to [`RunHooks::on_text_delta`].
    Streaming,
}

impl CompletionMode {
    /// Pick a mode from a streaming flag.
    #[must_use]
    pub const fn from_streaming(streaming: bool) -> Self {
        if streaming {
            Self::Streaming
        } else {
            Self::Batched
        }
    }

    /// Returns `true` for streaming.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

/// Bounded exponential backoff for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Set the number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first delay.
    #[must_use]
    pub const fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Delay before retry number `attempt` (zero-based), doubling each time.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Raw text of one model turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Model output, cut at the stop sequence if the provider echoed it.
    pub text: String,
    /// Why generation stopped.
    pub stop_reason: Option<StopReason>,
    /// Token usage of this completion.
    pub usage: Usage,
}

/// Requests one model turn for a conversation.
#[derive(Clone)]
pub struct CompletionClient {
    provider: SharedChatProvider,
    model: String,
    system_prompt: String,
    sampling: SamplingConfig,
    format: OutputFormat,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.model)
            .field("sampling", &self.sampling)
            .field("format", &self.format)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    /// Create a client. An empty model name falls back to the provider default.
    #[must_use]
    pub fn new(provider: SharedChatProvider, model: impl Into<String>) -> Self {
        let mut model = model.into();
        if model.is_empty() {
            model = provider.default_model().to_owned();
        }
        Self {
            provider,
            model,
            system_prompt: String::new(),
            sampling: SamplingConfig::default(),
            format: OutputFormat::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set sampling parameters.
    #[must_use]
    pub const fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The model requested.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The system prompt sent with every request.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the provider request for a conversation.
    #[must_use]
    pub fn build_request(&self, conversation: &Conversation) -> ChatRequest {
        let mut request = ChatRequest::new(&self.model)
            .turns(conversation)
            .max_tokens(self.sampling.max_tokens)
            .temperature(self.sampling.temperature);
        if !self.system_prompt.is_empty() {
            request = request.system(&self.system_prompt);
        }
        if !self.format.prefill.is_empty() {
            request = request.assistant(&self.format.prefill);
        }
        if !self.format.stop_sequence.is_empty() {
            request = request.stop_sequence(&self.format.stop_sequence);
        }
        request
    }

    /// Request one completion.
    ///
    /// Retryable provider errors are retried per the [`RetryPolicy`]; the
    /// request is identical on every attempt. A stream that fails midway is
    /// restarted and its partial text discarded.
    ///
    /// # Errors
    ///
    /// The last provider error once retries are exhausted, or the first
    /// non-retryable one.
    pub async fn complete(
        &self,
        conversation: &Conversation,
        mode: CompletionMode,
        hooks: &dyn RunHooks,
    ) -> Result<Completion> {
        let request = self.build_request(conversation);
        debug!(
            provider = self.provider.provider_name(),
            model = %self.model,
            turns = request.messages.len(),
            streaming = mode.is_streaming(),
            "Sending completion request"
        );

        let mut attempt = 0;
        loop {
            let outcome = match mode {
                CompletionMode::Batched => self.provider.chat(&request).await,
                CompletionMode::Streaming => self.stream_once(&request, hooks).await,
            };
            match outcome {
                Ok(response) => return Ok(self.finish(response)),
                Err(Error::Llm(err)) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Completion failed, retrying"
                    );
                    hooks.on_completion_retry(attempt, &err).await;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn stream_once(&self, request: &ChatRequest, hooks: &dyn RunHooks) -> Result<ChatResponse> {
        let mut stream = self.provider.chat_stream(request).await?;
        let mut aggregator = StreamAggregator::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let StreamChunk::Text(delta) = &chunk
                && !delta.is_empty()
            {
                hooks.on_text_delta(delta).await;
            }
            aggregator.apply(&chunk);
        }
        Ok(aggregator.into_chat_response())
    }

    fn finish(&self, response: ChatResponse) -> Completion {
        let mut text = response.text;
        let stop = &self.format.stop_sequence;
        if !stop.is_empty()
            && let Some(at) = text.find(stop.as_str())
        {
            text.truncate(at);
        }
        debug!(text = %text, stop_reason = ?response.stop_reason, "Completion received");
        Completion {
            text,
            stop_reason: response.stop_reason,
            usage: response.usage.unwrap_or_default(),
        }
    }
}
