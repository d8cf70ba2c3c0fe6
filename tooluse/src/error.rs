//! Unified error types for the tooluse crate.
//!
//! This module provides the error hierarchy used across the turn loop:
//! - LLM provider errors (transport, authentication, rate limiting, etc.)
//! - Tool dispatch errors (unknown tool, invalid arguments, execution)
//! - Run-level errors (unparseable model output, turn budget, cancellation)

use std::fmt;

use crate::parse::ParseError;

/// Result type alias for tooluse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the tooluse crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// LLM provider or transport error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The model produced output that could not be parsed into a result.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The turn budget was exhausted before the model produced a final answer.
    #[error("Turn budget of {max_turns} exhausted without a final answer")]
    BudgetExceeded {
        /// The configured maximum number of turns.
        max_turns: usize,
    },

    /// The run was cancelled through its cancel signal.
    #[error("Run cancelled{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Cancelled {
        /// Optional reason given when cancelling.
        reason: Option<String>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a budget exceeded error.
    #[must_use]
    pub const fn budget_exceeded(max_turns: usize) -> Self {
        Self::BudgetExceeded { max_turns }
    }

    /// Create a cancellation error.
    #[must_use]
    pub const fn cancelled(reason: Option<String>) -> Self {
        Self::Cancelled { reason }
    }

    /// Returns `true` if this error came from unparseable model output.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

#[cfg(feature = "anthropic")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Llm(err.into())
    }
}

/// Error type for LLM provider operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LlmError {
    /// The error kind.
    pub kind: LlmErrorKind,
    /// The provider name (e.g., "anthropic", "scripted").
    pub provider: Option<String>,
    /// Additional error message.
    pub message: String,
    /// Optional error code from the provider.
    pub code: Option<String>,
}

/// Categories of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LlmErrorKind {
    /// Authentication or authorization failure.
    Auth,
    /// Rate limit exceeded.
    RateLimited,
    /// Provider reported itself overloaded or failed server-side.
    Overloaded,
    /// Response envelope did not have the expected shape.
    ResponseFormat,
    /// Network or connection error.
    Network,
    /// Streaming error.
    Stream,
    /// HTTP status error.
    HttpStatus,
    /// Provider-specific error.
    Provider,
    /// Internal error.
    Internal,
    /// Feature not supported.
    NotSupported,
}

impl LlmError {
    const fn with_kind(kind: LlmErrorKind, message: String) -> Self {
        Self {
            kind,
            provider: None,
            message,
            code: None,
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Auth,
            provider: Some(provider.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::RateLimited,
            provider: Some(provider.into()),
            message: "Rate limit exceeded. Please retry after some time.".into(),
            code: None,
        }
    }

    /// Create an overloaded / server-side failure error.
    #[must_use]
    pub fn overloaded(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Overloaded,
            provider: Some(provider.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::with_kind(
            LlmErrorKind::ResponseFormat,
            format!("Expected {}, got {}", expected.into(), got.into()),
        )
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Network, message.into())
    }

    /// Create a streaming error.
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Stream, message.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::HttpStatus,
            provider: None,
            message: format!("HTTP {status}: {}", body.into()),
            code: Some(status.to_string()),
        }
    }

    /// Create a provider error with an error code.
    #[must_use]
    pub fn provider_code(
        provider: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: LlmErrorKind::Provider,
            provider: Some(provider.into()),
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Internal, message.into())
    }

    /// Create a not supported error.
    #[must_use]
    pub fn not_supported(feature: impl Into<String>) -> Self {
        Self::with_kind(
            LlmErrorKind::NotSupported,
            format!("Feature not supported: {}", feature.into()),
        )
    }

    /// Attach the provider name if none is set yet.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        if self.provider.is_none() {
            self.provider = Some(provider.into());
        }
        self
    }

    /// Check if this is a retryable error.
    ///
    /// Re-sending a completion request for an unchanged conversation is
    /// always safe, so transient failures can be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            LlmErrorKind::RateLimited
                | LlmErrorKind::Network
                | LlmErrorKind::Overloaded
                | LlmErrorKind::Stream
        )
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{provider}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for LlmError {}

#[cfg(feature = "anthropic")]
impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            Self::response_format("decodable response body", err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

/// Error type for tool dispatch failures.
///
/// These never abort a run: the orchestrator reports them back into the
/// conversation so the model can correct itself on the next turn.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Invalid or missing arguments.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran but failed.
    #[error("Execution error: {0}")]
    Execution(String),
}

impl ToolError {
    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create an invalid arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    mod error {
        use super::*;

        #[test]
        fn budget_exceeded_creates_error() {
            let err = Error::budget_exceeded(10);
            assert!(matches!(err, Error::BudgetExceeded { max_turns: 10 }));
            assert!(err.to_string().contains("10"));
        }

        #[test]
        fn cancelled_display_with_and_without_reason() {
            assert_eq!(Error::cancelled(None).to_string(), "Run cancelled");
            assert_eq!(
                Error::cancelled(Some("ctrl-c".into())).to_string(),
                "Run cancelled: ctrl-c"
            );
        }

        #[test]
        fn from_llm_error() {
            let err: Error = LlmError::network("timeout").into();
            assert!(matches!(err, Error::Llm(_)));
        }

        #[test]
        fn from_parse_error_is_distinct() {
            let err: Error = ParseError::schema("missing result", "{}").into();
            assert!(err.is_parse());
            assert!(!Error::budget_exceeded(1).is_parse());
        }

        #[test]
        fn from_io_error() {
            let err: Error = std::io::Error::other("disk").into();
            assert!(matches!(err, Error::Io(_)));
            assert!(err.to_string().contains("disk"));
        }
    }

    mod llm_error {
        use super::*;

        #[test]
        fn auth_creates_error() {
            let err = LlmError::auth("anthropic", "Invalid API key");
            assert_eq!(err.kind, LlmErrorKind::Auth);
            assert_eq!(err.provider.as_deref(), Some("anthropic"));
            assert!(err.code.is_none());
        }

        #[test]
        fn http_status_creates_error() {
            let err = LlmError::http_status(400, "Bad Request");
            assert_eq!(err.kind, LlmErrorKind::HttpStatus);
            assert!(err.message.contains("400"));
            assert_eq!(err.code.as_deref(), Some("400"));
        }

        #[test]
        fn retryable_kinds() {
            assert!(LlmError::rate_limited("anthropic").is_retryable());
            assert!(LlmError::network("reset").is_retryable());
            assert!(LlmError::overloaded("anthropic", "busy").is_retryable());
            assert!(LlmError::stream("cut off").is_retryable());
        }

        #[test]
        fn non_retryable_kinds() {
            assert!(!LlmError::auth("anthropic", "bad key").is_retryable());
            assert!(!LlmError::response_format("object", "array").is_retryable());
            assert!(!LlmError::not_supported("streaming").is_retryable());
            assert!(!LlmError::http_status(400, "no").is_retryable());
            assert!(!LlmError::internal("bug").is_retryable());
        }

        #[test]
        fn with_provider_keeps_existing() {
            let err = LlmError::auth("anthropic", "x").with_provider("other");
            assert_eq!(err.provider.as_deref(), Some("anthropic"));
            let err = LlmError::network("x").with_provider("scripted");
            assert_eq!(err.provider.as_deref(), Some("scripted"));
        }

        #[test]
        fn display_with_provider_and_code() {
            let err = LlmError::provider_code("anthropic", "overloaded_error", "Overloaded");
            let s = err.to_string();
            assert!(s.contains("[anthropic]"));
            assert!(s.contains("Overloaded"));
            assert!(s.contains("(code: overloaded_error)"));
        }

        #[test]
        fn display_without_provider() {
            let s = LlmError::network("timeout").to_string();
            assert!(!s.contains('['));
            assert!(s.contains("timeout"));
        }
    }

    mod tool_error {
        use super::*;

        #[test]
        fn display_all_variants() {
            assert!(ToolError::not_found("n").to_string().contains("not found"));
            assert!(ToolError::invalid_args("a").to_string().contains("Invalid"));
            assert!(ToolError::execution("e").to_string().contains("Execution"));
        }

        #[test]
        fn from_serde_json_error() {
            let json_err = serde_json::from_str::<i32>("invalid").unwrap_err();
            let err: ToolError = json_err.into();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }
    }
}
