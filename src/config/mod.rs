//! Downloader configuration
//!
//! Parses and validates the TOML config file (default `lcdl.toml`):
//!
//! ```toml
//! [telegram]
//! api_key = "123456:ABC"
//! allowed_chats = [-1001180711841]
//!
//! [storage]
//! download_dir = "/srv/builds"
//!
//! [logging]
//! level = "info"
//! directory = "/var/log/lcdl"
//! ```

mod defaults;

pub use defaults::{API_KEY_ENV, DEFAULT_CONFIG_PATH, LOG_FILE_NAME};

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur when loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bot credentials and channel allow-list
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token (overridable via `LCDL_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Bot API endpoint
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Chat ids whose posts are ingested; everything else is ignored
    #[serde(default)]
    pub allowed_chats: Vec<i64>,

    #[serde(default = "defaults::poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "defaults::poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Upper bound on a single download. Unset waits indefinitely.
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("allowed_chats", &self.allowed_chats)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the `<project>/<version>/` tree
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Also append logs to `<directory>/lcdl.log`
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            directory: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, applying environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::parse_with_api_key(&content, env_key)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::parse_with_api_key(content, None)
    }

    fn parse_with_api_key(content: &str, api_key: Option<String>) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            config.telegram.api_key = key;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the parsed configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("telegram.api_key".to_string()));
        }

        if self.telegram.allowed_chats.is_empty() {
            return Err(ConfigError::MissingField("telegram.allowed_chats".to_string()));
        }

        if !self.telegram.api_url.starts_with("http://")
            && !self.telegram.api_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "telegram.api_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", self.telegram.api_url),
            });
        }

        if self.telegram.download_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "telegram.download_timeout_secs".to_string(),
                reason: "must be greater than zero (omit it to disable)".to_string(),
            });
        }

        if self.storage.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("storage.download_dir".to_string()));
        }

        Ok(())
    }

    /// Allow-list as a set for dispatch lookups.
    pub fn allowed_chats(&self) -> HashSet<i64> {
        self.telegram.allowed_chats.iter().copied().collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.telegram.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.poll_timeout_secs)
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        self.telegram.download_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[telegram]
api_key = "123:abc"
allowed_chats = [-1001180711841]

[storage]
download_dir = "/srv/builds"
"#;

    #[test]
    fn test_parse_minimal_applies_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_interval_secs, 1);
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.download_timeout(), None);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.directory.is_none());
        assert_eq!(config.storage.download_dir, PathBuf::from("/srv/builds"));
        assert!(config.allowed_chats().contains(&-1001180711841));
    }

    #[test]
    fn test_parse_full() {
        let content = r#"
[telegram]
api_key = "123:abc"
api_url = "http://localhost:8081"
allowed_chats = [-1, -2]
poll_interval_secs = 5
poll_timeout_secs = 50
download_timeout_secs = 600

[storage]
download_dir = "builds"

[logging]
level = "debug"
directory = "/var/log/lcdl"
"#;
        let config = Config::parse(content).unwrap();

        assert_eq!(config.allowed_chats().len(), 2);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.poll_timeout(), Duration::from_secs(50));
        assert_eq!(config.download_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.directory, Some(PathBuf::from("/var/log/lcdl")));
    }

    #[test]
    fn test_missing_api_key() {
        let content = r#"
[telegram]
allowed_chats = [-1]

[storage]
download_dir = "/srv/builds"
"#;
        let result = Config::parse(content);
        assert!(matches!(result, Err(ConfigError::MissingField(f)) if f == "telegram.api_key"));
    }

    #[test]
    fn test_env_key_fills_missing_api_key() {
        let content = r#"
[telegram]
allowed_chats = [-1]

[storage]
download_dir = "/srv/builds"
"#;
        let config = Config::parse_with_api_key(content, Some("999:env".to_string())).unwrap();
        assert_eq!(config.telegram.api_key, "999:env");
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        let content = r#"
[telegram]
api_key = "123:abc"
allowed_chats = []

[storage]
download_dir = "/srv/builds"
"#;
        let result = Config::parse(content);
        assert!(matches!(result, Err(ConfigError::MissingField(f)) if f == "telegram.allowed_chats"));
    }

    #[test]
    fn test_zero_download_timeout_rejected() {
        let content = format!("{}\n", MINIMAL.replace(
            "allowed_chats = [-1001180711841]",
            "allowed_chats = [-1001180711841]\ndownload_timeout_secs = 0",
        ));
        let result = Config::parse(&content);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_storage_section_is_parse_error() {
        let content = r#"
[telegram]
api_key = "123:abc"
allowed_chats = [-1]
"#;
        assert!(matches!(Config::parse(content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::parse(MINIMAL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("123:abc"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
