//! Built-in defaults for optional configuration values.

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "lcdl.toml";

/// Environment variable overriding `telegram.api_key`.
pub const API_KEY_ENV: &str = "LCDL_API_KEY";

/// Log file name inside `logging.directory`.
pub const LOG_FILE_NAME: &str = "lcdl.log";

pub(super) fn api_url() -> String {
    lcdl_telegram::DEFAULT_API_URL.to_string()
}

/// Delay before polling again after a failed `getUpdates` (seconds).
pub(super) fn poll_interval_secs() -> u64 {
    1
}

/// Long-poll timeout passed to `getUpdates` (seconds).
pub(super) fn poll_timeout_secs() -> u64 {
    30
}

pub(super) fn log_level() -> String {
    "info".to_string()
}
