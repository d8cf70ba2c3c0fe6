//! Anthropic Messages API client and wire types.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::{LlmError, Result};
use crate::message::Turn;
use crate::stream::StopReason;
use crate::usage::Usage;

use super::config::AnthropicConfig;

pub(crate) const PROVIDER: &str = "anthropic";

/// Request body for `POST /v1/messages`.
#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub messages: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub stop_sequences: &'a [String],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// Batched response body.
#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// One content block of a response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Error envelope: `{"type": "error", "error": {"type": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Error details, also carried by the `error` stream event.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Recompute the total for a usage object read off the wire.
pub(crate) const fn wire_usage(usage: Usage) -> Usage {
    Usage::new(usage.input_tokens, usage.output_tokens).with_cache(
        usage.cache_read_input_tokens,
        usage.cache_creation_input_tokens,
    )
}

/// Anthropic Messages API client.
#[derive(Debug, Clone)]
pub struct Anthropic {
    pub(crate) config: Arc<AnthropicConfig>,
    pub(crate) client: Client,
}

impl Anthropic {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an authentication error for an empty API key, or an internal
    /// error if the HTTP client cannot be built.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::auth(PROVIDER, "API key is required").into());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// See [`AnthropicConfig::from_env`] and [`Anthropic::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env()?)
    }

    /// Get the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub(crate) fn build_body<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> MessagesRequest<'a> {
        let model = if request.model.is_empty() {
            self.config.model.as_str()
        } else {
            request.model.as_str()
        };
        MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: &request.messages,
            temperature: request.temperature,
            stop_sequences: &request.stop_sequences,
            stream,
        }
    }

    pub(crate) fn build_request(&self) -> reqwest::RequestBuilder {
        self.client
            .post(self.config.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header("content-type", "application/json")
    }

    pub(crate) fn parse_response(response: MessagesResponse) -> ChatResponse {
        let text: String = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect();

        let mut out = ChatResponse::new(text)
            .with_model(response.model)
            .with_id(response.id);
        if let Some(reason) = response.stop_reason.as_deref() {
            out = out.with_stop_reason(StopReason::parse(reason));
        }
        if let Some(usage) = response.usage {
            out = out.with_usage(wire_usage(usage));
        }
        out
    }

    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let message = parsed
            .as_ref()
            .map_or_else(|| body.to_owned(), |e| e.error.message.clone());

        match status {
            401 | 403 => LlmError::auth(PROVIDER, message),
            429 => LlmError::rate_limited(PROVIDER),
            500..=599 => {
                let mut err = LlmError::overloaded(PROVIDER, message);
                err.code = parsed.map(|e| e.error.kind);
                err
            }
            _ => match parsed {
                Some(envelope) => {
                    LlmError::provider_code(PROVIDER, envelope.error.kind, envelope.error.message)
                }
                None => LlmError::http_status(status, body).with_provider(PROVIDER),
            },
        }
    }

    pub(crate) fn stream_error(error: ApiError) -> LlmError {
        let mut err = if error.kind == "overloaded_error" {
            LlmError::overloaded(PROVIDER, error.message)
        } else {
            LlmError::stream(error.message).with_provider(PROVIDER)
        };
        err.code = Some(error.kind);
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::{Error, LlmErrorKind};
    use serde_json::json;

    fn client() -> Anthropic {
        Anthropic::new(AnthropicConfig::new("test-key")).unwrap()
    }

    #[test]
    fn empty_key_is_auth_error() {
        let Err(Error::Llm(err)) = Anthropic::new(AnthropicConfig::default()) else {
            panic!("expected auth error");
        };
        assert_eq!(err.kind, LlmErrorKind::Auth);
    }

    #[test]
    fn body_carries_every_field() {
        let anthropic = client();
        let request = ChatRequest::new("claude-3-haiku-20240307")
            .system("sys")
            .user("What is 1 + 1?")
            .assistant("Here is the result in JSON: <json>")
            .max_tokens(1000)
            .temperature(0.0)
            .stop_sequence("</json>");

        let body = serde_json::to_value(anthropic.build_body(&request, false)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 1000,
                "system": "sys",
                "messages": [
                    {"role": "user", "content": "What is 1 + 1?"},
                    {"role": "assistant", "content": "Here is the result in JSON: <json>"}
                ],
                "temperature": 0.0,
                "stop_sequences": ["</json>"]
            })
        );

        let streaming = serde_json::to_value(anthropic.build_body(&request, true)).unwrap();
        assert_eq!(streaming["stream"], true);
    }

    #[test]
    fn empty_model_uses_config_default() {
        let anthropic = client();
        let request = ChatRequest::new("");
        assert_eq!(
            anthropic.build_body(&request, false).model,
            AnthropicConfig::DEFAULT_MODEL
        );
    }

    #[test]
    fn response_joins_text_blocks() {
        let raw = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-sonnet-20240229",
            "content": [
                {"type": "text", "text": "{\"result\": "},
                {"type": "tool_use", "id": "t", "name": "x", "input": {}},
                {"type": "text", "text": "\"stop\"}"}
            ],
            "stop_reason": "stop_sequence",
            "stop_sequence": "</json>",
            "usage": {"input_tokens": 40, "output_tokens": 12}
        });
        let parsed: MessagesResponse = serde_json::from_value(raw).unwrap();
        let response = Anthropic::parse_response(parsed);
        assert_eq!(response.text, "{\"result\": \"stop\"}");
        assert_eq!(response.stop_reason, Some(StopReason::StopSequence));
        assert_eq!(response.usage, Some(Usage::new(40, 12)));
        assert_eq!(response.id.as_deref(), Some("msg_01"));
    }

    #[test]
    fn empty_content_gives_empty_text() {
        let parsed: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_02", "model": "m", "content": [], "stop_reason": "end_turn"
        }))
        .unwrap();
        assert!(Anthropic::parse_response(parsed).text.is_empty());
    }

    mod errors {
        use super::*;

        fn body(kind: &str, message: &str) -> String {
            json!({"type": "error", "error": {"type": kind, "message": message}}).to_string()
        }

        #[test]
        fn auth_statuses() {
            for status in [401, 403] {
                let err = Anthropic::parse_error(status, &body("authentication_error", "bad"));
                assert_eq!(err.kind, LlmErrorKind::Auth);
                assert!(!err.is_retryable());
            }
        }

        #[test]
        fn rate_limit_is_retryable() {
            let err = Anthropic::parse_error(429, &body("rate_limit_error", "slow down"));
            assert_eq!(err.kind, LlmErrorKind::RateLimited);
            assert!(err.is_retryable());
        }

        #[test]
        fn server_errors_are_retryable() {
            for status in [500, 503, 529] {
                let err = Anthropic::parse_error(status, &body("overloaded_error", "Overloaded"));
                assert!(err.is_retryable(), "status {status}");
                assert_eq!(err.code.as_deref(), Some("overloaded_error"));
            }
            assert!(Anthropic::parse_error(502, "<html>bad gateway</html>").is_retryable());
        }

        #[test]
        fn client_errors_are_not_retryable() {
            let err = Anthropic::parse_error(400, &body("invalid_request_error", "bad field"));
            assert_eq!(err.kind, LlmErrorKind::Provider);
            assert_eq!(err.code.as_deref(), Some("invalid_request_error"));
            assert!(!err.is_retryable());

            let err = Anthropic::parse_error(404, "not found");
            assert_eq!(err.kind, LlmErrorKind::HttpStatus);
        }

        #[test]
        fn stream_error_mapping() {
            let err = Anthropic::stream_error(ApiError {
                kind: "overloaded_error".into(),
                message: "Overloaded".into(),
            });
            assert_eq!(err.kind, LlmErrorKind::Overloaded);

            let err = Anthropic::stream_error(ApiError {
                kind: "api_error".into(),
                message: "boom".into(),
            });
            assert_eq!(err.kind, LlmErrorKind::Stream);
            assert_eq!(err.code.as_deref(), Some("api_error"));
        }
    }
}
