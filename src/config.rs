use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::access_log::AccessLogConfig;
use crate::csrf::CsrfConfig;
use crate::error::{AppError, Result};
use crate::security::SecurityConfig;
use crate::session::SessionConfig;
use crate::utils::{get_env_with_prefix, parse_flag};

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Stage,
    Prod,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Dev
    }

    /// Cookies get the `Secure` attribute only in production
    pub fn is_production(self) -> bool {
        self == Self::Prod
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Stage => "stage",
            Self::Prod => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Dev),
            "stage" | "staging" => Ok(Self::Stage),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(AppError::config(format!(
                "Invalid environment: {}. Must be one of: dev, stage, prod",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub access_log: AccessLogConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Config {
    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }

    /// Explicit template cache setting, else on everywhere but dev
    pub fn use_template_cache(&self) -> bool {
        self.templates
            .use_cache
            .unwrap_or(!self.environment.is_development())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum buffered form body in bytes (default: 1 MiB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Directory served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateConfig {
    /// Directory holding `*.page.hbs` and `*.layout.hbs`
    #[serde(default = "default_template_dir")]
    pub dir: String,
    /// `None` follows the environment
    #[serde(default)]
    pub use_cache: Option<bool>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: default_template_dir(),
            use_cache: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_body_size() -> usize {
    crate::csrf::DEFAULT_MAX_BODY_SIZE
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_template_dir() -> String {
    "templates".to_string()
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
    invalid: Vec<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            invalid: Vec::new(),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.server.max_body_size = max_body_size;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.server.static_dir = dir.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_csrf(mut self, csrf: CsrfConfig) -> Self {
        self.config.csrf = csrf;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.templates.dir = dir.into();
        self
    }

    pub fn with_template_cache(mut self, enabled: bool) -> Self {
        self.config.templates.use_cache = Some(enabled);
        self
    }

    pub fn with_access_log(mut self, access_log: AccessLogConfig) -> Self {
        self.config.access_log = access_log;
        self
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// Load configuration from `ROOMSTAY_`-prefixed (or bare) environment variables
    pub fn from_env(mut self) -> Self {
        if let Some(env) = get_env_with_prefix("ENV") {
            match env.parse() {
                Ok(environment) => self.config.environment = environment,
                Err(e) => self.invalid.push(e.to_string()),
            }
        }

        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }

        if let Some(port) = get_env_with_prefix("PORT") {
            match port.parse() {
                Ok(p) => self.config.server.port = p,
                Err(_) => self.invalid.push(format!("Invalid port: {}", port)),
            }
        }

        if let Some(max_body_size) = get_env_with_prefix("MAX_BODY_SIZE") {
            if let Ok(size) = max_body_size.parse() {
                self.config.server.max_body_size = size;
            }
        }

        if let Some(dir) = get_env_with_prefix("STATIC_DIR") {
            self.config.server.static_dir = dir;
        }

        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }

        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = parse_flag(&json).unwrap_or(false);
        }

        if let Some(dir) = get_env_with_prefix("TEMPLATE_DIR") {
            self.config.templates.dir = dir;
        }

        if let Some(use_cache) = get_env_with_prefix("TEMPLATE_CACHE") {
            self.config.templates.use_cache = parse_flag(&use_cache);
        }

        self.config.csrf = CsrfConfig::from_env();
        self.config.session = SessionConfig::from_env();
        self.config.security = SecurityConfig::from_env();

        self.config.access_log = AccessLogConfig::from_env();
        if get_env_with_prefix("ACCESS_LOG_CONSOLE").is_none() {
            self.config.access_log.console = self.config.environment.is_development();
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an unparsable environment or port, an
    /// invalid server address or log level, zero limits, or clashing cookie
    /// names.
    pub fn build(self) -> Result<Config> {
        if let Some(problem) = self.invalid.into_iter().next() {
            return Err(AppError::config(problem));
        }

        let config = self.config;

        config.server.addr().map_err(|e| {
            AppError::config(format!(
                "Invalid server address {}:{} - {}",
                config.server.host, config.server.port, e
            ))
        })?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(AppError::config(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if config.server.max_body_size == 0 {
            return Err(AppError::config("Maximum body size must be greater than 0"));
        }

        if config.csrf.max_age_seconds == 0 {
            return Err(AppError::config("CSRF cookie max age must be greater than 0"));
        }

        if config.session.ttl_seconds == 0 {
            return Err(AppError::config("Session TTL must be greater than 0"));
        }

        if config.csrf.cookie_name.is_empty() || config.session.cookie_name.is_empty() {
            return Err(AppError::config("Cookie names must not be empty"));
        }

        if config.csrf.cookie_name == config.session.cookie_name {
            return Err(AppError::config(format!(
                "CSRF and session cookies must differ, both are {}",
                config.csrf.cookie_name
            )));
        }

        if config.access_log.enabled {
            if config.access_log.path.is_empty() {
                return Err(AppError::config("Access log path must not be empty"));
            }
            if config.access_log.max_size_bytes == 0 {
                return Err(AppError::config("Access log max size must be greater than 0"));
            }
        }

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.max_body_size, 1024 * 1024);
        assert_eq!(config.templates.dir, "templates");
        assert!(!config.secure_cookies());
        assert!(!config.use_template_cache());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("Staging".parse::<Environment>().unwrap(), Environment::Stage);
        assert!(matches!(
            "qa".parse::<Environment>(),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_production_enables_secure_cookies_and_cache() {
        let config = ConfigBuilder::new()
            .with_environment(Environment::Prod)
            .build()
            .unwrap();
        assert!(config.secure_cookies());
        assert!(config.use_template_cache());

        let config = ConfigBuilder::new()
            .with_environment(Environment::Prod)
            .with_template_cache(false)
            .build()
            .unwrap();
        assert!(!config.use_template_cache());
    }

    #[test]
    fn test_invalid_log_level() {
        let result = ConfigBuilder::new().with_log_level("chatty").build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_body_size_rejected() {
        assert!(ConfigBuilder::new().with_max_body_size(0).build().is_err());
    }

    #[test]
    fn test_cookie_name_clash_rejected() {
        let csrf = CsrfConfig::builder().cookie_name("roomstay_session").build();
        assert!(ConfigBuilder::new().with_csrf(csrf).build().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(
            r#"{"environment":"stage","server":{"port":8080},"templates":{"use_cache":true}}"#,
        )
        .unwrap();
        assert_eq!(config.environment, Environment::Stage);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.use_template_cache());
        assert_eq!(config.session.cookie_name, "roomstay_session");
    }
}
