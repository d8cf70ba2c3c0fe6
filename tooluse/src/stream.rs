//! Streaming response types.
//!
//! Providers turn their wire events into [`StreamChunk`]s; only text chunks
//! carry model output; the rest is bookkeeping. [`StreamAggregator`] folds a
//! chunk sequence back into the same [`ChatResponse`] a batched call returns.

use serde::{Deserialize, Serialize};

use crate::chat::ChatResponse;
use crate::usage::Usage;

/// A chunk of streaming response from an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text content fragment.
    Text(String),

    /// Token usage report (may arrive more than once per stream).
    Usage(Usage),

    /// Stream is complete.
    Done {
        /// Why the model stopped, if the provider said.
        stop_reason: Option<StopReason>,
    },
}

impl StreamChunk {
    /// Create a text chunk.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Get the text if this is a text chunk.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if this is the final chunk.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Reason why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the assistant turn.
    #[default]
    EndTurn,
    /// A configured stop sequence was generated.
    StopSequence,
    /// Maximum token limit reached.
    MaxTokens,
    /// Model decided to call native tools.
    ToolUse,
    /// Any reason this crate does not model.
    Other,
}

impl StopReason {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EndTurn => "end_turn",
            Self::StopSequence => "stop_sequence",
            Self::MaxTokens => "max_tokens",
            Self::ToolUse => "tool_use",
            Self::Other => "other",
        }
    }

    /// Parse a provider stop reason (case-insensitive).
    ///
    /// Accepts the Anthropic names and the common `stop` / `length` aliases.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "end_turn" | "stop" => Self::EndTurn,
            "stop_sequence" => Self::StopSequence,
            "max_tokens" | "length" => Self::MaxTokens,
            "tool_use" | "tool_calls" => Self::ToolUse,
            _ => Self::Other,
        }
    }

    /// Returns `true` if the model was cut off due to length.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::MaxTokens)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folds stream chunks into a complete response.
#[derive(Debug, Clone, Default)]
pub struct StreamAggregator {
    text: String,
    usage: Option<Usage>,
    stop_reason: Option<StopReason>,
}

impl StreamAggregator {
    /// Creates a new aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a stream chunk to the aggregator.
    pub fn apply(&mut self, chunk: &StreamChunk) {
        match chunk {
            StreamChunk::Text(text) => self.text.push_str(text),
            StreamChunk::Usage(usage) => match &mut self.usage {
                Some(current) => current.merge(usage),
                None => self.usage = Some(*usage),
            },
            StreamChunk::Done { stop_reason } => {
                if stop_reason.is_some() {
                    self.stop_reason = *stop_reason;
                }
            }
        }
    }

    /// Returns the current accumulated text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the accumulated usage.
    #[must_use]
    pub const fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Returns the stop reason.
    #[must_use]
    pub const fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Converts the accumulated stream data into a [`ChatResponse`].
    #[must_use]
    pub fn into_chat_response(self) -> ChatResponse {
        let mut response = ChatResponse::new(self.text);
        if let Some(reason) = self.stop_reason {
            response = response.with_stop_reason(reason);
        }
        if let Some(usage) = self.usage {
            response = response.with_usage(usage);
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    mod stop_reason {
        use super::*;

        #[test]
        fn parse_anthropic_names() {
            assert_eq!(StopReason::parse("end_turn"), StopReason::EndTurn);
            assert_eq!(StopReason::parse("stop_sequence"), StopReason::StopSequence);
            assert_eq!(StopReason::parse("max_tokens"), StopReason::MaxTokens);
            assert_eq!(StopReason::parse("tool_use"), StopReason::ToolUse);
        }

        #[test]
        fn parse_is_case_insensitive_with_fallback() {
            assert_eq!(StopReason::parse("STOP_SEQUENCE"), StopReason::StopSequence);
            assert_eq!(StopReason::parse("length"), StopReason::MaxTokens);
            assert_eq!(StopReason::parse("refusal"), StopReason::Other);
        }

        #[test]
        fn display_roundtrips_through_parse() {
            for reason in [
                StopReason::EndTurn,
                StopReason::StopSequence,
                StopReason::MaxTokens,
                StopReason::ToolUse,
            ] {
                assert_eq!(StopReason::parse(&reason.to_string()), reason);
            }
            assert!(StopReason::MaxTokens.is_truncated());
        }
    }

    mod aggregator {
        use super::*;

        #[test]
        fn concatenates_text_in_order() {
            let mut agg = StreamAggregator::new();
            for piece in ["{\"res", "ult\": ", "\"stop\"}"] {
                agg.apply(&StreamChunk::text(piece));
            }
            assert_eq!(agg.text(), "{\"result\": \"stop\"}");
        }

        #[test]
        fn non_text_chunks_do_not_touch_text() {
            let mut agg = StreamAggregator::new();
            agg.apply(&StreamChunk::text("a"));
            agg.apply(&StreamChunk::Usage(Usage::new(10, 0)));
            agg.apply(&StreamChunk::text("b"));
            agg.apply(&StreamChunk::Usage(Usage::new(0, 4)));
            agg.apply(&StreamChunk::Done {
                stop_reason: Some(StopReason::StopSequence),
            });

            assert_eq!(agg.text(), "ab");
            assert_eq!(agg.usage(), Some(Usage::new(10, 4)));
            assert_eq!(agg.stop_reason(), Some(StopReason::StopSequence));
        }

        #[test]
        fn done_without_reason_keeps_earlier_reason() {
            let mut agg = StreamAggregator::new();
            agg.apply(&StreamChunk::Done {
                stop_reason: Some(StopReason::EndTurn),
            });
            agg.apply(&StreamChunk::Done { stop_reason: None });
            assert_eq!(agg.stop_reason(), Some(StopReason::EndTurn));
        }

        #[test]
        fn into_chat_response() {
            let mut agg = StreamAggregator::new();
            agg.apply(&StreamChunk::text("hello"));
            agg.apply(&StreamChunk::Usage(Usage::new(3, 1)));
            agg.apply(&StreamChunk::Done {
                stop_reason: Some(StopReason::EndTurn),
            });
            let response = agg.into_chat_response();
            assert_eq!(response.text, "hello");
            assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
            assert_eq!(response.usage, Some(Usage::new(3, 1)));
        }

        #[test]
        fn empty_stream_gives_empty_text() {
            let response = StreamAggregator::new().into_chat_response();
            assert!(response.text.is_empty());
            assert!(response.stop_reason.is_none());
        }
    }

    #[test]
    fn chunk_helpers() {
        assert_eq!(StreamChunk::text("x").as_text(), Some("x"));
        assert!(StreamChunk::Usage(Usage::zero()).as_text().is_none());
        assert!(StreamChunk::Done { stop_reason: None }.is_done());
    }
}
