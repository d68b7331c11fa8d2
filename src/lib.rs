//! Roomstay - a server-rendered booking site on Axum
//!
//! The pages are thin; the interesting part is the request pipeline every
//! page runs through:
//!
//! - **Security headers** on every response
//! - **Access log** lines written through a size/age [`RotatingLogWriter`]
//! - **Sessions** loaded per request and exposed through [`RequestContext`]
//! - **CSRF** double-submit tokens, issued on safe requests and checked on
//!   unsafe ones
//! - **Templates** compiled lazily into a shared [`TemplateCache`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use roomstay::{App, ConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> roomstay::Result<()> {
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     roomstay::init_tracing_with_config(&config);
//!
//!     App::with_config(config)?.serve().await
//! }
//! ```

mod app;
pub mod access_log;
mod config;
mod context;
mod core;
pub mod csrf;
mod error;
pub mod handlers;
pub mod health;
pub mod http;
pub mod render;
pub mod security;
pub mod session;
pub mod testing;
pub mod traits;
pub mod utils;

// Re-exports for public API
pub use access_log::{AccessLogConfig, AccessLogConfigBuilder, RotatingLogWriter, RotationPolicy};
pub use app::{AppState, AppStateBuilder};
pub use config::{Config, ConfigBuilder, Environment, LoggingConfig, ServerConfig, TemplateConfig};
pub use context::RequestContext;
pub use core::{App, STATIC_CACHE_CONTROL};
pub use csrf::{CsrfConfig, CsrfConfigBuilder, CsrfFailureMode, CsrfProtection, CsrfToken};
pub use error::{AppError, Result};
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use render::{DirectorySource, MemorySource, TemplateCache, TemplateData};
pub use security::{SecurityConfig, SecurityConfigBuilder};
pub use session::{InMemorySessionStore, Session, SessionConfig, SessionManager};
pub use traits::session::{SessionData, SessionStore};
pub use traits::template::{Layout, TemplateSource};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: log filter (e.g. "info", "roomstay=debug")
/// - `ROOMSTAY_LOG_JSON`: "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("ROOMSTAY_LOG_JSON")
        .ok()
        .and_then(|v| utils::parse_flag(&v))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing from the logging section of `config`
///
/// `RUST_LOG` still wins when it is set.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    install_subscriber(env_filter, config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        // Already installed, e.g. by a test harness
        eprintln!("tracing subscriber not installed: {}", e);
    }
}
