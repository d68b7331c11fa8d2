use crate::{
    access_log::build_access_log_layer,
    app::AppState,
    config::Config,
    csrf::{issue_token, validate_token},
    error::{AppError, Result},
    handlers,
    health::health_handler,
    security::build_security_headers_layer,
    session::session_middleware,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    middleware::from_fn_with_state,
    routing::get,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Cache policy for everything under `/static`
pub const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// The booking application: page routes plus the request pipeline
pub struct App {
    pages: Router<AppState>,
    state: AppState,
}

impl App {
    /// App serving the bundled pages with `state`
    pub fn new(state: AppState) -> Self {
        Self {
            pages: handlers::routes(),
            state,
        }
    }

    /// Build state from `config` (templates directory, access log file) and wrap it
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self::new(AppState::from_config(config)?))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Add page routes; they run behind the session and CSRF layers like the
    /// bundled pages
    pub fn merge_pages(mut self, pages: Router<AppState>) -> Self {
        self.pages = self.pages.merge(pages);
        self
    }

    /// Assemble the full router
    ///
    /// Layers from the outside in: request id and tracing, security headers,
    /// access log, then for pages only: session, CSRF validation, CSRF
    /// issuance. `/static` and `/health` skip the session and CSRF layers.
    fn into_router(self) -> Result<Router> {
        let state = self.state;

        // Last added runs first
        let pages = self
            .pages
            .layer(from_fn_with_state(state.csrf.clone(), issue_token))
            .layer(from_fn_with_state(state.csrf.clone(), validate_token))
            .layer(from_fn_with_state(state.sessions.clone(), session_middleware));

        let static_files = ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static(STATIC_CACHE_CONTROL),
            ))
            .service(ServeDir::new(&state.config.server.static_dir));

        let mut router = pages
            .route("/health", get(health_handler))
            .nest_service("/static", static_files)
            .fallback(not_found)
            .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
            .with_state(state.clone());

        if let Some(access_log) =
            build_access_log_layer(&state.config.access_log, state.access_log.clone())
        {
            router = router.layer(access_log);
        }

        if let Some(security) = build_security_headers_layer(&state.config.security)? {
            router = router.layer(security);
        }

        router = router
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Ok(router)
    }

    /// Router with every layer applied, for in-process tests
    pub fn into_test_router(self) -> Result<Router> {
        self.into_router()
    }

    /// Bind, serve until Ctrl+C or SIGTERM, then close the access log
    pub async fn serve(self) -> Result<()> {
        let addr = self.state.config.server.addr().map_err(|e| {
            AppError::config(format!("Invalid server address: {}", e))
        })?;

        let state = self.state.clone();
        let cleanup = state.sessions.spawn_cleanup();
        let router = self.into_router()?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(
            environment = %state.config.environment,
            template_cache = state.templates.use_cache(),
            "Server starting on http://{}",
            addr
        );

        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        if let Some(cleanup) = cleanup {
            cleanup.abort();
        }
        state.close();

        result.map_err(AppError::from)
    }
}

async fn not_found() -> AppError {
    AppError::not_found("No such page")
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Grace period for in-flight requests
    tokio::time::sleep(Duration::from_secs(1)).await;
}
