use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::utils::get_env_with_prefix;

/// What to do when an unsafe request fails CSRF validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CsrfFailureMode {
    /// Reply 403 Forbidden
    Forbidden,
    /// Store a one-shot session error and redirect back to the same path
    Redirect,
}

impl Default for CsrfFailureMode {
    fn default() -> Self {
        Self::Forbidden
    }
}

/// CSRF protection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsrfConfig {
    /// Name of the cookie holding the token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Request header checked before the form field (AJAX callers)
    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// Form field carrying the token in traditional form posts
    #[serde(default = "default_form_field")]
    pub form_field: String,

    /// Cookie lifetime in seconds
    #[serde(default = "default_max_age_seconds")]
    pub max_age_seconds: u64,

    /// Behavior on validation failure
    #[serde(default)]
    pub failure_mode: CsrfFailureMode,

    /// Message stored in the session when `failure_mode` is `Redirect`
    #[serde(default = "default_failure_message")]
    pub failure_message: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            header_name: default_header_name(),
            form_field: default_form_field(),
            max_age_seconds: default_max_age_seconds(),
            failure_mode: CsrfFailureMode::default(),
            failure_message: default_failure_message(),
        }
    }
}

impl CsrfConfig {
    pub fn builder() -> CsrfConfigBuilder {
        CsrfConfigBuilder::new()
    }

    /// Load CSRF configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(name) = get_env_with_prefix("CSRF_COOKIE_NAME") {
            config.cookie_name = name;
        }

        if let Some(max_age) = get_env_with_prefix("CSRF_MAX_AGE_SECONDS") {
            if let Ok(seconds) = max_age.parse() {
                config.max_age_seconds = seconds;
            }
        }

        if let Some(mode) = get_env_with_prefix("CSRF_FAILURE_MODE") {
            config.failure_mode = match mode.to_lowercase().as_str() {
                "redirect" => CsrfFailureMode::Redirect,
                _ => CsrfFailureMode::Forbidden,
            };
        }

        config
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }
}

/// Builder for CsrfConfig
#[must_use = "builder does nothing until you call build()"]
pub struct CsrfConfigBuilder {
    config: CsrfConfig,
}

impl CsrfConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CsrfConfig::default(),
        }
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.cookie_name = name.into();
        self
    }

    pub fn max_age_seconds(mut self, seconds: u64) -> Self {
        self.config.max_age_seconds = seconds;
        self
    }

    pub fn failure_mode(mut self, mode: CsrfFailureMode) -> Self {
        self.config.failure_mode = mode;
        self
    }

    pub fn redirect_on_failure(self) -> Self {
        self.failure_mode(CsrfFailureMode::Redirect)
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.config.failure_message = message.into();
        self
    }

    pub fn build(self) -> CsrfConfig {
        self.config
    }
}

impl Default for CsrfConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_cookie_name() -> String {
    "__csrf_token".to_string()
}

fn default_header_name() -> String {
    "x-csrf-token".to_string()
}

fn default_form_field() -> String {
    "csrf_token".to_string()
}

fn default_max_age_seconds() -> u64 {
    12 * 60 * 60 // 12 hours
}

fn default_failure_message() -> String {
    "Your form session expired. Please try again.".to_string()
}
