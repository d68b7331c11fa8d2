use crate::utils::{get_env_with_prefix, parse_flag};
use serde::{Deserialize, Serialize};

/// X-Frame-Options header value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameOptions {
    #[default]
    Deny,
    SameOrigin,
}

impl FrameOptions {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deny => "DENY",
            Self::SameOrigin => "SAMEORIGIN",
        }
    }
}

/// Referrer-Policy header value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferrerPolicy {
    NoReferrer,
    SameOrigin,
    #[default]
    StrictOriginWhenCrossOrigin,
    StrictOrigin,
}

impl ReferrerPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoReferrer => "no-referrer",
            Self::SameOrigin => "same-origin",
            Self::StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
            Self::StrictOrigin => "strict-origin",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "no-referrer" => Some(Self::NoReferrer),
            "same-origin" => Some(Self::SameOrigin),
            "strict-origin-when-cross-origin" => Some(Self::StrictOriginWhenCrossOrigin),
            "strict-origin" => Some(Self::StrictOrigin),
            _ => None,
        }
    }
}

/// Response headers added to every page and asset
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// `X-Content-Type-Options: nosniff`
    #[serde(default = "default_nosniff")]
    pub nosniff: bool,

    /// `X-Frame-Options`; `None` omits the header
    #[serde(default = "default_frame_options")]
    pub frame_options: Option<FrameOptions>,

    /// `X-XSS-Protection: 1; mode=block` for older browsers
    #[serde(default = "default_xss_protection")]
    pub xss_protection: bool,

    #[serde(default = "default_referrer_policy")]
    pub referrer_policy: Option<ReferrerPolicy>,

    #[serde(default)]
    pub content_security_policy: Option<String>,

    /// `Strict-Transport-Security` max-age in seconds; 0 disables it
    #[serde(default)]
    pub hsts_max_age: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            nosniff: default_nosniff(),
            frame_options: default_frame_options(),
            xss_protection: default_xss_protection(),
            referrer_policy: default_referrer_policy(),
            content_security_policy: None,
            hsts_max_age: 0,
        }
    }
}

impl SecurityConfig {
    pub fn builder() -> SecurityConfigBuilder {
        SecurityConfigBuilder::new()
    }

    /// Load security configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(enabled) = get_env_with_prefix("SECURITY_ENABLED") {
            config.enabled = parse_flag(&enabled).unwrap_or(true);
        }

        if let Some(frame_options) = get_env_with_prefix("SECURITY_FRAME_OPTIONS") {
            config.frame_options = match frame_options.to_uppercase().as_str() {
                "SAMEORIGIN" => Some(FrameOptions::SameOrigin),
                "OFF" | "DISABLE" => None,
                _ => Some(FrameOptions::Deny),
            };
        }

        if let Some(referrer) = get_env_with_prefix("SECURITY_REFERRER_POLICY") {
            config.referrer_policy = ReferrerPolicy::parse(&referrer);
        }

        if let Some(csp) = get_env_with_prefix("SECURITY_CSP") {
            config.content_security_policy = Some(csp).filter(|csp| !csp.is_empty());
        }

        if let Some(max_age) = get_env_with_prefix("SECURITY_HSTS_MAX_AGE") {
            if let Ok(age) = max_age.parse() {
                config.hsts_max_age = age;
            }
        }

        config
    }
}

/// Builder for SecurityConfig
#[must_use = "builder does nothing until you call build()"]
pub struct SecurityConfigBuilder {
    config: SecurityConfig,
}

impl SecurityConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SecurityConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn frame_options(mut self, options: Option<FrameOptions>) -> Self {
        self.config.frame_options = options;
        self
    }

    pub fn referrer_policy(mut self, policy: Option<ReferrerPolicy>) -> Self {
        self.config.referrer_policy = policy;
        self
    }

    pub fn content_security_policy(mut self, csp: impl Into<String>) -> Self {
        self.config.content_security_policy = Some(csp.into());
        self
    }

    pub fn hsts_max_age(mut self, seconds: u64) -> Self {
        self.config.hsts_max_age = seconds;
        self
    }

    pub fn build(self) -> SecurityConfig {
        self.config
    }
}

impl Default for SecurityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_nosniff() -> bool {
    true
}

fn default_frame_options() -> Option<FrameOptions> {
    Some(FrameOptions::Deny)
}

fn default_xss_protection() -> bool {
    true
}

fn default_referrer_policy() -> Option<ReferrerPolicy> {
    Some(ReferrerPolicy::StrictOriginWhenCrossOrigin)
}
