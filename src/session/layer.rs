use super::{Session, SessionConfig};
use crate::context::RequestContext;
use crate::http::{append_set_cookie, get_cookie, strict_cookie};
use crate::traits::session::SessionStore;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Loads and persists the session around every request
///
/// # Example
///
/// ```rust,ignore
/// let manager = SessionManager::new(Arc::new(InMemorySessionStore::new()), SessionConfig::default());
/// let router = Router::new()
///     .route("/", get(home))
///     .layer(axum::middleware::from_fn_with_state(manager, session_middleware));
/// ```
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
    secure: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            secure: false,
        }
    }

    /// Mark the session cookie `Secure` (production)
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Session for the cookie in `headers`
    ///
    /// Missing, unknown or expired ids start a fresh session. A store failure
    /// is logged and also starts a fresh session.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        let Some(id) = get_cookie(headers, &self.config.cookie_name) else {
            return Session::new(self.config.ttl());
        };

        match self.store.load(&id).await {
            Ok(Some(data)) => Session::from_store(id, data),
            Ok(None) => Session::new(self.config.ttl()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load session, starting a fresh one");
                Session::new(self.config.ttl())
            }
        }
    }

    /// Persist a modified session and set its cookie on the response
    ///
    /// Untouched sessions are neither saved nor re-cookied. A store failure is
    /// logged and leaves the response without a session cookie.
    pub async fn commit(&self, session: &Session, headers: &mut HeaderMap) {
        let (id, data, modified, is_new) = session.snapshot();
        if !modified {
            return;
        }

        if is_new && data.is_empty() {
            // Written then emptied again within a single request
            return;
        }

        if let Err(e) = self.store.save(&id, data).await {
            tracing::error!(error = %e, "Failed to save session");
            return;
        }
        session.mark_saved();

        let cookie = strict_cookie(
            self.config.cookie_name.clone(),
            id,
            round_up_secs(session.ttl_remaining()),
            self.secure,
        );
        append_set_cookie(headers, &cookie);
    }

    /// Periodically sweep expired sessions from the store
    ///
    /// Returns `None` when the cleanup interval is configured as zero.
    pub fn spawn_cleanup(&self) -> Option<JoinHandle<()>> {
        let period = self.config.cleanup_interval()?;
        let store = self.store.clone();

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                match store.cleanup_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "Removed expired sessions"),
                    Err(e) => tracing::warn!(error = %e, "Session cleanup failed"),
                }
            }
        }))
    }
}

fn round_up_secs(duration: Duration) -> Duration {
    let extra = u64::from(duration.subsec_nanos() > 0);
    Duration::from_secs(duration.as_secs() + extra)
}

/// Session middleware for `axum::middleware::from_fn_with_state`
pub async fn session_middleware(
    State(manager): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = manager.load(request.headers()).await;
    RequestContext::update(request.extensions_mut(), |ctx| {
        ctx.with_session(session.clone())
    });

    let mut response = next.run(request).await;
    manager.commit(&session, response.headers_mut()).await;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::session::InMemorySessionStore;
    use crate::traits::session::SessionData;
    use async_trait::async_trait;
    use axum::http::{HeaderValue, header};

    fn manager(store: Arc<dyn SessionStore>) -> SessionManager {
        SessionManager::new(store, SessionConfig::default())
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn load(&self, _: &str) -> Result<Option<SessionData>> {
            Err(AppError::Session("store offline".to_string()))
        }
        async fn save(&self, _: &str, _: SessionData) -> Result<()> {
            Err(AppError::Session("store offline".to_string()))
        }
        async fn delete(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn cleanup_expired(&self) -> Result<usize> {
            Ok(0)
        }
        fn is_healthy(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_untouched_new_session_is_not_saved() {
        let store = Arc::new(InMemorySessionStore::new());
        let manager = manager(store.clone());

        let session = manager.load(&HeaderMap::new()).await;
        let mut response_headers = HeaderMap::new();
        manager.commit(&session, &mut response_headers).await;

        assert!(store.is_empty().await);
        assert!(response_headers.get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_modified_session_is_saved_and_cookied() {
        let store = Arc::new(InMemorySessionStore::new());
        let manager = manager(store.clone());

        let session = manager.load(&HeaderMap::new()).await;
        session.put_string("remote_ip", "127.0.0.1");
        let mut response_headers = HeaderMap::new();
        manager.commit(&session, &mut response_headers).await;

        assert_eq!(store.len().await, 1);
        let set_cookie = response_headers
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with(&format!("roomstay_session={}", session.id())));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(set_cookie.contains("Max-Age=86400"));
        assert!(!set_cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn test_existing_session_is_reloaded() {
        let store = Arc::new(InMemorySessionStore::new());
        let manager = manager(store.clone());

        let first = manager.load(&HeaderMap::new()).await;
        first.put_string("flash", "hello");
        manager.commit(&first, &mut HeaderMap::new()).await;

        let headers = cookie_headers(&format!("roomstay_session={}", first.id()));
        let second = manager.load(&headers).await;
        assert!(!second.is_new());
        assert_eq!(second.id(), first.id());
        assert_eq!(second.pop_string("flash").as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_unknown_cookie_starts_fresh_session() {
        let manager = manager(Arc::new(InMemorySessionStore::new()));
        let session = manager.load(&cookie_headers("roomstay_session=forged")).await;

        assert!(session.is_new());
        assert_ne!(session.id(), "forged");
    }

    #[tokio::test]
    async fn test_store_failures_degrade() {
        let manager = manager(Arc::new(FailingStore));

        let session = manager.load(&cookie_headers("roomstay_session=abc")).await;
        assert!(session.is_new());

        session.put_string("k", "v");
        let mut response_headers = HeaderMap::new();
        manager.commit(&session, &mut response_headers).await;
        assert!(response_headers.get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_secure_cookie() {
        let manager = manager(Arc::new(InMemorySessionStore::new())).secure(true);
        let session = manager.load(&HeaderMap::new()).await;
        session.put_string("k", "v");

        let mut response_headers = HeaderMap::new();
        manager.commit(&session, &mut response_headers).await;
        let set_cookie = response_headers.get(header::SET_COOKIE).unwrap();
        assert!(set_cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_round_up_secs() {
        assert_eq!(round_up_secs(Duration::from_millis(86_399_999)), Duration::from_secs(86_400));
        assert_eq!(round_up_secs(Duration::from_secs(10)), Duration::from_secs(10));
    }
}
