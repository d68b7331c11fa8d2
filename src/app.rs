use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::access_log::RotatingLogWriter;
use crate::config::Config;
use crate::csrf::CsrfProtection;
use crate::error::Result;
use crate::render::{DirectorySource, TemplateCache};
use crate::session::{InMemorySessionStore, SessionManager};
use crate::traits::session::SessionStore;
use crate::traits::template::TemplateSource;

/// Shared state handed to every handler and middleware
///
/// The template cache and the access log writer are owned here and shared
/// by reference; nothing in the pipeline reaches for a global.
#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<TemplateCache>,
    pub sessions: SessionManager,
    pub csrf: CsrfProtection,
    pub access_log: Option<Arc<RotatingLogWriter>>,
    pub config: Arc<Config>,
    started_at: Instant,
}

impl AppState {
    /// Builder for state assembled around `config`
    pub fn builder(config: Config) -> AppStateBuilder {
        AppStateBuilder::new(config)
    }

    /// State with every collaborator derived from `config`
    ///
    /// Templates come from `config.templates.dir`, sessions live in memory
    /// and the access log file is opened when access logging is enabled.
    pub fn from_config(config: Config) -> Result<Self> {
        let source = DirectorySource::new(&config.templates.dir);
        let mut builder = Self::builder(config).with_template_source(Arc::new(source));

        if builder.config.access_log.enabled {
            let access_log = &builder.config.access_log;
            let writer = RotatingLogWriter::open(
                Path::new(&access_log.path),
                access_log.policy(),
                access_log.console,
            )?;
            builder = builder.with_access_log(Arc::new(writer));
        }

        Ok(builder.build())
    }

    /// Time since the state was built
    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Flush and close the access log, if one is attached
    pub fn close(&self) {
        if let Some(writer) = &self.access_log {
            if let Err(e) = writer.close() {
                tracing::error!(error = %e, "Failed to close access log");
            }
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("templates", &self.templates)
            .field("csrf", &self.csrf)
            .field("access_log", &self.access_log.as_ref().map(|w| w.path()))
            .field("environment", &self.config.environment)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AppState`]
///
/// Anything not supplied falls back to an empty in-memory template source,
/// an in-memory session store and no access log file.
#[must_use = "builder does nothing until you call build()"]
pub struct AppStateBuilder {
    config: Config,
    template_source: Option<Arc<dyn TemplateSource>>,
    session_store: Option<Arc<dyn SessionStore>>,
    access_log: Option<Arc<RotatingLogWriter>>,
}

impl AppStateBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            template_source: None,
            session_store: None,
            access_log: None,
        }
    }

    pub fn with_template_source(mut self, source: Arc<dyn TemplateSource>) -> Self {
        self.template_source = Some(source);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_access_log(mut self, writer: Arc<RotatingLogWriter>) -> Self {
        self.access_log = Some(writer);
        self
    }

    pub fn build(self) -> AppState {
        let config = self.config;
        let secure = config.secure_cookies();

        let source = self
            .template_source
            .unwrap_or_else(|| Arc::new(crate::render::MemorySource::new()));
        let templates = Arc::new(TemplateCache::new(source, config.use_template_cache()));

        let store = self
            .session_store
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
        let sessions = SessionManager::new(store, config.session.clone()).secure(secure);

        let csrf = CsrfProtection::new(config.csrf.clone())
            .secure(secure)
            .max_body_size(config.server.max_body_size);

        AppState {
            templates,
            sessions,
            csrf,
            access_log: self.access_log,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}
