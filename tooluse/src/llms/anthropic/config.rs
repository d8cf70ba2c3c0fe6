//! Anthropic client configuration.

use crate::error::{LlmError, Result};

/// Configuration for the Anthropic Messages API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// Base URL for the API, without the `/v1/messages` path.
    pub base_url: String,
    /// Default model to use.
    pub model: String,
    /// Value of the `anthropic-version` header.
    pub api_version: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl AnthropicConfig {
    /// Default Anthropic API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "claude-3-sonnet-20240229";
    /// Default API version header.
    pub const DEFAULT_API_VERSION: &'static str = "2023-06-01";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `ANTHROPIC_API_KEY` - Required API key
    /// - `ANTHROPIC_BASE_URL` - Optional base URL
    /// - `ANTHROPIC_MODEL` - Optional default model
    ///
    /// # Errors
    ///
    /// Returns an authentication error if `ANTHROPIC_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            LlmError::auth("anthropic", "ANTHROPIC_API_KEY environment variable not set")
        })?;

        let base_url = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_owned());

        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_owned());

        Ok(Self {
            api_key,
            base_url,
            model,
            ..Self::default()
        })
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the `anthropic-version` header value.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// The messages endpoint URL.
    #[must_use]
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            api_version: Self::DEFAULT_API_VERSION.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = AnthropicConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, AnthropicConfig::DEFAULT_BASE_URL);
        assert_eq!(config.model, AnthropicConfig::DEFAULT_MODEL);
        assert_eq!(config.api_version, "2023-06-01");
        assert_eq!(config.timeout_secs, Some(120));
    }

    #[test]
    fn builder() {
        let config = AnthropicConfig::new("key")
            .with_model("claude-3-haiku-20240307")
            .with_base_url("http://localhost:8080/")
            .with_api_version("2024-01-01")
            .with_timeout(30);

        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.api_version, "2024-01-01");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.messages_url(), "http://localhost:8080/v1/messages");
    }
}
