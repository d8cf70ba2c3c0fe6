//! Scripted provider that replays canned model output.
//!
//! Each call consumes the next [`ScriptedReply`]. Every request is recorded
//! so tests can inspect exactly what the model would have seen. Streaming
//! splits the text into small fragments and interleaves usage and done
//! chunks, as a real server would.
//!
//! ```rust,ignore
//! use tooluse::llms::ScriptedProvider;
//!
//! let provider = ScriptedProvider::new([
//!     r#"{"result": "tool_use", "tool_calls": [{"tool": "get_current_location"}]}"#,
//!     r#"{"result": "stop", "content": "Sunny in Guangzhou."}"#,
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, ChatStream};
use crate::error::{LlmError, Result};
use crate::stream::{StopReason, StreamChunk};
use crate::usage::Usage;

const PROVIDER: &str = "scripted";

/// One scripted provider response.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Model output text.
    Text(String),
    /// The call fails before producing anything.
    Fail(LlmError),
    /// Streaming emits `partial` and then fails; batched fails outright.
    FailMidStream {
        /// Text emitted before the failure.
        partial: String,
        /// The failure.
        error: LlmError,
    },
}

impl ScriptedReply {
    /// A reply whose stream breaks after `partial`.
    #[must_use]
    pub fn fail_mid_stream(partial: impl Into<String>, error: LlmError) -> Self {
        Self::FailMidStream {
            partial: partial.into(),
            error,
        }
    }
}

impl From<&str> for ScriptedReply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for ScriptedReply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<LlmError> for ScriptedReply {
    fn from(err: LlmError) -> Self {
        Self::Fail(err)
    }
}

/// A [`ChatProvider`] that replays a fixed script.
#[derive(Debug)]
pub struct ScriptedProvider {
    model: String,
    replies: Vec<ScriptedReply>,
    cursor: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
    fragment_len: usize,
    stop_echo: bool,
}

impl ScriptedProvider {
    /// Create a provider that answers with `replies` in order.
    pub fn new<I, R>(replies: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ScriptedReply>,
    {
        Self {
            model: "scripted-model".to_owned(),
            replies: replies.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            fragment_len: 7,
            stop_echo: false,
        }
    }

    /// Build a script from text with one model output per non-empty line.
    #[must_use]
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// Set the reported model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the streaming fragment size in characters (minimum 1).
    #[must_use]
    pub fn with_fragment_len(mut self, len: usize) -> Self {
        self.fragment_len = len.max(1);
        self
    }

    /// Append the request's stop sequence to every reply, as some servers do.
    #[must_use]
    pub const fn with_stop_echo(mut self, echo: bool) -> Self {
        self.stop_echo = echo;
        self
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of replies not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies
            .len()
            .saturating_sub(self.cursor.load(Ordering::SeqCst))
    }

    fn next_reply(&self, request: &ChatRequest) -> Result<ScriptedReply> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.replies.get(index).cloned().ok_or_else(|| {
            LlmError::internal(format!(
                "script exhausted after {} replies",
                self.replies.len()
            ))
            .with_provider(PROVIDER)
            .into()
        })
    }

    fn reply_text(&self, text: &str, request: &ChatRequest) -> String {
        match request.stop_sequences.first() {
            Some(stop) if self.stop_echo => format!("{text}{stop}"),
            _ => text.to_owned(),
        }
    }

    fn fragments(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.fragment_len)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

fn input_tokens(request: &ChatRequest) -> u32 {
    let system = request.system.as_deref().map_or(0, word_count);
    request
        .messages
        .iter()
        .map(|turn| word_count(&turn.content))
        .fold(system, u32::saturating_add)
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        match self.next_reply(request)? {
            ScriptedReply::Text(text) => Ok(ChatResponse::new(self.reply_text(&text, request))
                .with_stop_reason(StopReason::StopSequence)
                .with_usage(Usage::new(input_tokens(request), word_count(&text)))
                .with_model(&self.model)),
            ScriptedReply::Fail(error) | ScriptedReply::FailMidStream { error, .. } => {
                Err(error.with_provider(PROVIDER).into())
            }
        }
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let (text, failure) = match self.next_reply(request)? {
            ScriptedReply::Text(text) => (text, None),
            ScriptedReply::Fail(error) => return Err(error.with_provider(PROVIDER).into()),
            ScriptedReply::FailMidStream { partial, error } => (partial, Some(error)),
        };

        let mut chunks: Vec<Result<StreamChunk>> =
            vec![Ok(StreamChunk::Usage(Usage::new(input_tokens(request), 0)))];
        chunks.extend(
            self.fragments(&self.reply_text(&text, request))
                .into_iter()
                .map(|fragment| Ok(StreamChunk::Text(fragment))),
        );
        match failure {
            Some(error) => chunks.push(Err(error.with_provider(PROVIDER).into())),
            None => {
                chunks.push(Ok(StreamChunk::Usage(Usage::new(0, word_count(&text)))));
                chunks.push(Ok(StreamChunk::Done {
                    stop_reason: Some(StopReason::StopSequence),
                }));
            }
        }
        Ok(Box::pin(stream::iter(chunks)))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::{Error, LlmErrorKind};
    use futures::StreamExt;

    #[tokio::test]
    async fn replays_in_order_and_records_requests() {
        let provider = ScriptedProvider::new(["first", "second"]);
        let r1 = provider.chat(&ChatRequest::new("m").user("a")).await.unwrap();
        let r2 = provider.chat(&ChatRequest::new("m").user("b")).await.unwrap();
        assert_eq!(r1.text, "first");
        assert_eq!(r2.text, "second");
        assert_eq!(r1.stop_reason, Some(StopReason::StopSequence));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages[0].content, "b");
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_script_is_internal_error() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let Err(Error::Llm(err)) = provider.chat(&ChatRequest::new("m")).await else {
            panic!("expected llm error");
        };
        assert_eq!(err.kind, LlmErrorKind::Internal);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn stream_interleaves_bookkeeping_chunks() {
        let provider = ScriptedProvider::new(["abcdefghij"]).with_fragment_len(4);
        let chunks: Vec<StreamChunk> = provider
            .chat_stream(&ChatRequest::new("m").user("one two"))
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        let texts: Vec<&str> = chunks.iter().filter_map(StreamChunk::as_text).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
        assert!(matches!(chunks[0], StreamChunk::Usage(_)));
        assert!(chunks.last().unwrap().is_done());
    }

    #[tokio::test]
    async fn fragments_respect_char_boundaries() {
        let provider = ScriptedProvider::new(["晴天☀️ok"]).with_fragment_len(1);
        let text: String = provider
            .chat_stream(&ChatRequest::new("m"))
            .await
            .unwrap()
            .filter_map(|c| async move { c.ok().and_then(|c| c.as_text().map(str::to_owned)) })
            .collect()
            .await;
        assert_eq!(text, "晴天☀️ok");
    }

    #[tokio::test]
    async fn stop_echo_appends_request_stop_sequence() {
        let provider = ScriptedProvider::new(["{}"]).with_stop_echo(true);
        let resp = provider
            .chat(&ChatRequest::new("m").stop_sequence("</json>"))
            .await
            .unwrap();
        assert_eq!(resp.text, "{}</json>");
    }

    #[tokio::test]
    async fn mid_stream_failure_yields_partial_then_error() {
        let provider = ScriptedProvider::new([ScriptedReply::fail_mid_stream(
            "abc",
            LlmError::stream("reset"),
        )]);
        let items: Vec<Result<StreamChunk>> = provider
            .chat_stream(&ChatRequest::new("m"))
            .await
            .unwrap()
            .collect()
            .await;
        assert!(items.iter().any(|i| matches!(i, Ok(StreamChunk::Text(_)))));
        assert!(items.last().unwrap().is_err());
    }

    #[test]
    fn from_lines_skips_blank_lines() {
        let provider = ScriptedProvider::from_lines("  {\"a\":1}\n\n{\"b\":2}\n");
        assert_eq!(provider.remaining(), 2);
    }
}
