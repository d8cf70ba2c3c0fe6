//! Anthropic SSE stream decoding.
//!
//! The server sends `event: <name>` / `data: <json>` line pairs. Network
//! chunks can split a line anywhere, including inside a multi-byte UTF-8
//! sequence, so bytes are buffered until a full line is available.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::{LlmError, Result};
use crate::stream::{StopReason, StreamChunk};
use crate::usage::Usage;

use super::client::{Anthropic, ApiError, PROVIDER, wire_usage};

/// Decode an HTTP body stream into stream chunks.
///
/// A transport failure mid-body ends the stream with a retryable
/// [`LlmError::stream`].
pub(crate) fn decode_sse<S>(bytes: S) -> impl Stream<Item = Result<StreamChunk>> + Send
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send,
{
    async_stream::try_stream! {
        futures::pin_mut!(bytes);
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk
                .map_err(|e| LlmError::stream(e.to_string()).with_provider(PROVIDER))?;
            for item in decoder.feed(&chunk) {
                yield item?;
            }
        }
        for item in decoder.finish() {
            yield item?;
        }
    }
}

/// Streaming event, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {
        message: MessageStartBody,
    },
    ContentBlockDelta {
        delta: ContentDelta,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        usage: Option<Usage>,
    },
    Error {
        error: ApiError,
    },
    // ping, content_block_start, content_block_stop, message_stop and
    // anything newer.
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Deserialize)]
struct MessageStartBody {
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaBody {
    stop_reason: Option<String>,
}

/// Incremental decoder from raw SSE bytes to [`StreamChunk`]s.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and return every chunk it completes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk>> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            decode_line(&line, &mut out);
        }
        out
    }

    /// Flush a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Vec<Result<StreamChunk>> {
        let mut out = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            decode_line(&line, &mut out);
        }
        out
    }
}

fn decode_line(line: &[u8], out: &mut Vec<Result<StreamChunk>>) {
    let text = String::from_utf8_lossy(line);
    let line = text.trim();

    // Blank separators, comments and `event:` names carry nothing we need;
    // the JSON payload repeats the event type.
    let Some(data) = line.strip_prefix("data:") else {
        return;
    };
    let data = data.trim();
    if data.is_empty() {
        return;
    }

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => convert_event(event, out),
        Err(e) => tracing::warn!("Failed to parse SSE event: {e}, data: {data}"),
    }
}

fn convert_event(event: StreamEvent, out: &mut Vec<Result<StreamChunk>>) {
    match event {
        StreamEvent::MessageStart { message } => {
            if let Some(usage) = message.usage {
                out.push(Ok(StreamChunk::Usage(wire_usage(usage))));
            }
        }
        StreamEvent::ContentBlockDelta {
            delta: ContentDelta::TextDelta { text },
        } => {
            if !text.is_empty() {
                out.push(Ok(StreamChunk::Text(text)));
            }
        }
        StreamEvent::MessageDelta { delta, usage } => {
            if let Some(usage) = usage {
                out.push(Ok(StreamChunk::Usage(wire_usage(usage))));
            }
            out.push(Ok(StreamChunk::Done {
                stop_reason: delta.stop_reason.as_deref().map(StopReason::parse),
            }));
        }
        StreamEvent::Error { error } => out.push(Err(Anthropic::stream_error(error).into())),
        StreamEvent::ContentBlockDelta {
            delta: ContentDelta::Other,
        }
        | StreamEvent::Ignored => {}
    }
}
