use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::utils::get_env_with_prefix;

/// Session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Session lifetime (in seconds)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Name of the cookie carrying the session id
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// How often expired sessions are swept from the store (0 disables)
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            cookie_name: default_cookie_name(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl SessionConfig {
    /// Load session configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ttl) = get_env_with_prefix("SESSION_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse() {
                config.ttl_seconds = seconds;
            }
        }

        if let Some(name) = get_env_with_prefix("SESSION_COOKIE_NAME") {
            config.cookie_name = name;
        }

        if let Some(interval) = get_env_with_prefix("SESSION_CLEANUP_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse() {
                config.cleanup_interval_seconds = seconds;
            }
        }

        config
    }

    /// Session lifetime as Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_seconds > 0)
            .then(|| Duration::from_secs(self.cleanup_interval_seconds))
    }
}

fn default_ttl_seconds() -> u64 {
    3600 * 24 // 24 hours
}

fn default_cookie_name() -> String {
    "roomstay_session".to_string()
}

fn default_cleanup_interval_seconds() -> u64 {
    600
}
