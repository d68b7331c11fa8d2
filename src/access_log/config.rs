use super::writer::{DEFAULT_MAX_SIZE, RotationPolicy};
use crate::utils::{get_env_with_prefix, parse_flag};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Access log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessLogConfig {
    /// Whether the access log layer is installed at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Log file location
    #[serde(default = "default_path")]
    pub path: String,

    /// Rotate once the file reaches this many bytes
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Rotate once the file is this many days old
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    /// Mirror every line to stdout
    #[serde(default)]
    pub console: bool,

    /// Level of the tracing event for 1xx-3xx responses
    #[serde(default = "default_success_level")]
    pub success_level: LogLevel,

    /// Level of the tracing event for 4xx responses
    #[serde(default = "default_client_error_level")]
    pub client_error_level: LogLevel,

    /// Level of the tracing event for 5xx responses
    #[serde(default = "default_server_error_level")]
    pub server_error_level: LogLevel,
}

/// Tracing level for access events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: default_path(),
            max_size_bytes: default_max_size_bytes(),
            max_age_days: default_max_age_days(),
            console: false,
            success_level: default_success_level(),
            client_error_level: default_client_error_level(),
            server_error_level: default_server_error_level(),
        }
    }
}

impl AccessLogConfig {
    pub fn builder() -> AccessLogConfigBuilder {
        AccessLogConfigBuilder::new()
    }

    /// Load access log configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(enabled) = get_env_with_prefix("ACCESS_LOG_ENABLED") {
            config.enabled = parse_flag(&enabled).unwrap_or(true);
        }

        if let Some(path) = get_env_with_prefix("ACCESS_LOG_PATH") {
            config.path = path;
        }

        if let Some(size) = get_env_with_prefix("ACCESS_LOG_MAX_SIZE_BYTES") {
            if let Ok(size) = size.parse() {
                config.max_size_bytes = size;
            }
        }

        if let Some(days) = get_env_with_prefix("ACCESS_LOG_MAX_AGE_DAYS") {
            if let Ok(days) = days.parse() {
                config.max_age_days = days;
            }
        }

        if let Some(console) = get_env_with_prefix("ACCESS_LOG_CONSOLE") {
            config.console = parse_flag(&console).unwrap_or(false);
        }

        if let Some(level) = get_env_with_prefix("ACCESS_LOG_SUCCESS_LEVEL") {
            config.success_level = parse_log_level(&level);
        }

        config
    }

    pub fn policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_size: self.max_size_bytes,
            max_age: Duration::from_secs(self.max_age_days * 24 * 60 * 60),
        }
    }
}

fn parse_log_level(s: &str) -> LogLevel {
    match s.to_lowercase().as_str() {
        "trace" => LogLevel::Trace,
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

/// Builder for AccessLogConfig
#[must_use = "builder does nothing until you call build()"]
pub struct AccessLogConfigBuilder {
    config: AccessLogConfig,
}

impl AccessLogConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AccessLogConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    pub fn max_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_size_bytes = bytes;
        self
    }

    pub fn max_age_days(mut self, days: u64) -> Self {
        self.config.max_age_days = days;
        self
    }

    pub fn console(mut self, console: bool) -> Self {
        self.config.console = console;
        self
    }

    pub fn success_level(mut self, level: LogLevel) -> Self {
        self.config.success_level = level;
        self
    }

    pub fn build(self) -> AccessLogConfig {
        self.config
    }
}

impl Default for AccessLogConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_path() -> String {
    "log/access.log".to_string()
}

fn default_max_size_bytes() -> u64 {
    DEFAULT_MAX_SIZE
}

fn default_max_age_days() -> u64 {
    14
}

fn default_success_level() -> LogLevel {
    LogLevel::Info
}

fn default_client_error_level() -> LogLevel {
    LogLevel::Warn
}

fn default_server_error_level() -> LogLevel {
    LogLevel::Error
}
