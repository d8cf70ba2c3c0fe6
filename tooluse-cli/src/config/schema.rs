//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tooluse::completion::{RetryPolicy, SamplingConfig};
use tooluse::llms::AnthropicConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Anthropic connection settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Turn-loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Transport retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Anthropic connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key. Empty means `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: String,
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    AnthropicConfig::DEFAULT_BASE_URL.to_owned()
}

fn default_model() -> String {
    AnthropicConfig::DEFAULT_MODEL.to_owned()
}

const fn default_timeout_secs() -> u64 {
    AnthropicConfig::DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Turn-loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Maximum completions per run.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
    /// Maximum output tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Stream completions and echo text as it arrives.
    #[serde(default)]
    pub streaming: bool,
    /// Tool bundle, see `tooluse tools --help`.
    #[serde(default = "default_toolset")]
    pub toolset: String,
}

const fn default_max_turns() -> usize {
    tooluse::agent::DEFAULT_MAX_TURNS
}

const fn default_max_tokens() -> u32 {
    tooluse::chat::DEFAULT_MAX_TOKENS
}

fn default_toolset() -> String {
    "full".to_owned()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            streaming: false,
            toolset: default_toolset(),
        }
    }
}

impl AgentConfig {
    /// Sampling parameters for the completion client.
    #[must_use]
    pub const fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Transport retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// The library retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy::none()
            .with_max_retries(self.max_retries)
            .with_initial_backoff(Duration::from_millis(self.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(self.max_backoff_ms))
    }
}

impl CliConfig {
    /// Fill an empty API key from `ANTHROPIC_API_KEY`.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if self.provider.api_key.is_empty()
            && let Ok(key) = std::env::var("ANTHROPIC_API_KEY")
        {
            self.provider.api_key = key;
        }
        self
    }

    /// Provider settings for the Anthropic client.
    #[must_use]
    pub fn anthropic(&self) -> AnthropicConfig {
        AnthropicConfig::new(&self.provider.api_key)
            .with_base_url(&self.provider.base_url)
            .with_model(&self.provider.model)
            .with_timeout(self.provider.timeout_secs)
    }

    /// Check the configuration for problems.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.provider.api_key.is_empty() {
            issues.push(ConfigIssue::warning(
                "provider.api_key",
                "no API key configured and ANTHROPIC_API_KEY is not set",
            ));
        }
        if self.agent.max_turns == 0 {
            issues.push(ConfigIssue::error(
                "agent.max_turns",
                "must be at least 1",
            ));
        }
        if self.agent.max_tokens == 0 {
            issues.push(ConfigIssue::error(
                "agent.max_tokens",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.agent.temperature) {
            issues.push(ConfigIssue::error(
                "agent.temperature",
                "must be between 0.0 and 1.0",
            ));
        }
        if tooluse::tools::toolset(&self.agent.toolset).is_none() {
            issues.push(ConfigIssue::error(
                "agent.toolset",
                format!(
                    "unknown toolset '{}', expected one of: {}",
                    self.agent.toolset,
                    tooluse::tools::TOOLSET_NAMES.join(", ")
                ),
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            issues.push(ConfigIssue::warning(
                "retry.initial_backoff_ms",
                "larger than retry.max_backoff_ms; the ceiling wins",
            ));
        }

        issues
    }

    /// Returns `true` if there are no error-level issues.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .validate()
            .iter()
            .any(|issue| issue.level == IssueLevel::Error)
    }
}

/// Configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    /// Issue severity level.
    pub level: IssueLevel,
    /// Configuration path (e.g., "agent.max_turns").
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl ConfigIssue {
    /// Create an error-level issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a warning-level issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            IssueLevel::Error => "ERROR",
            IssueLevel::Warning => "WARN",
        };
        write!(f, "[{}] {}: {}", prefix, self.path, self.message)
    }
}

/// Severity level for configuration issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    /// Prevents a run.
    Error,
    /// Worth knowing about.
    Warning,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.provider.model, "claude-3-sonnet-20240229");
        assert_eq!(config.agent.max_turns, 10);
        assert_eq!(config.agent.max_tokens, 1000);
        assert_eq!(config.agent.toolset, "full");
        assert!(!config.agent.streaming);
    }

    #[test]
    fn test_config_serialization() {
        let config = CliConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_sample_config() {
        let toml_str = r#"
[provider]
api_key = "sk-ant-xxx"
model = "claude-3-haiku-20240307"

[agent]
streaming = true
toolset = "arithmetic"

[retry]
max_retries = 5
"#;

        let config: CliConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.api_key, "sk-ant-xxx");
        assert_eq!(config.provider.base_url, "https://api.anthropic.com");
        assert!(config.agent.streaming);
        assert_eq!(config.agent.max_turns, 10);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(toml::from_str::<CliConfig>("[agent]\nmax_steps = 3\n").is_err());
        assert!(toml::from_str::<CliConfig>("[memory]\nenabled = true\n").is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = CliConfig::default();
        config.provider.api_key = "key".into();
        assert!(config.validate().is_empty());
        assert!(config.is_valid());
    }

    #[test]
    fn test_validation_missing_key_is_warning() {
        let issues = CliConfig::default().validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, IssueLevel::Warning);
    }

    #[test]
    fn test_validation_bad_values() {
        let mut config = CliConfig::default();
        config.agent.max_turns = 0;
        config.agent.toolset = "everything".into();
        assert!(!config.is_valid());
        let issues = config.validate();
        let paths: Vec<&str> = issues
            .iter()
            .filter(|i| i.level == IssueLevel::Error)
            .map(|i| i.path.as_str())
            .collect();
        assert_eq!(paths, ["agent.max_turns", "agent.toolset"]);
    }

    #[test]
    fn test_retry_policy() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy, RetryPolicy::default());
    }
}
