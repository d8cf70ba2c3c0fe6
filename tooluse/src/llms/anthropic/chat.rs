//! Anthropic `ChatProvider` implementation.

use async_trait::async_trait;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, ChatStream};
use crate::error::{LlmError, Result};

use super::client::{Anthropic, MessagesResponse, PROVIDER};
use super::stream::decode_sse;

impl Anthropic {
    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let body = self.build_body(request, stream);
        let response = self
            .build_request()
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from(e).with_provider(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for Anthropic {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self.send(request, false).await?;
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::from(e).with_provider(PROVIDER))?;
        let parsed: MessagesResponse = serde_json::from_str(&response_text).map_err(|e| {
            LlmError::response_format(
                "valid Anthropic response",
                format!("parse error: {e}, response: {response_text}"),
            )
            .with_provider(PROVIDER)
        })?;

        Ok(Self::parse_response(parsed))
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let response = self.send(request, true).await?;
        Ok(Box::pin(decode_sse(response.bytes_stream())))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        self.model()
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}
