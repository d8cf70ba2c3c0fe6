//! Configuration management for the `tooluse` CLI.
//!
//! Settings come from, in order of precedence:
//! 1. Command-line flags
//! 2. Config file (`~/.tooluse/config.toml`, or `--config` / `TOOLUSE_CONFIG`)
//! 3. `ANTHROPIC_API_KEY` for an empty API key
//! 4. Default values

mod schema;

pub use schema::{AgentConfig, CliConfig, ConfigIssue, IssueLevel, ProviderConfig, RetryConfig};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// The file exists and `--force` was not given.
    #[error("configuration already exists at {0}")]
    AlreadyExists(PathBuf),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Get the default config directory path.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tooluse")
}

/// Get the default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a specific path.
///
/// A missing file yields the defaults.
pub async fn load_config_from(path: &Path) -> ConfigResult<CliConfig> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(CliConfig::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: CliConfig = toml::from_str(&content)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Save configuration to a specific path.
pub async fn save_config_to(config: &CliConfig, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = toml::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), "saved config file");

    Ok(())
}

/// Write a default configuration file.
pub async fn init_config(path: &Path, force: bool) -> ConfigResult<CliConfig> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    let config = CliConfig::default();
    save_config_to(&config, path).await?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert!(default_config_dir().ends_with(".tooluse"));
        assert!(config_path().ends_with("config.toml"));
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = assert_fs::TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let written = init_config(&path, false).await.unwrap();
        assert_eq!(load_config_from(&path).await.unwrap(), written);

        let again = init_config(&path, false).await;
        assert!(matches!(again, Err(ConfigError::AlreadyExists(_))));
        assert!(init_config(&path, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_file_is_an_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[agent]\nmax_turns = \"many\"\n").await.unwrap();
        assert!(matches!(
            load_config_from(&path).await,
            Err(ConfigError::TomlParse(_))
        ));
    }
}
