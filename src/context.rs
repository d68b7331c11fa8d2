//! Explicit per-request context.
//!
//! The middleware layers publish what they know about a request (session
//! handle, CSRF token, parsed form, peer address) into a single
//! [`RequestContext`] stored in the request extensions. Handlers and the
//! template renderer read it back through typed accessors.

use crate::csrf::CsrfToken;
use crate::http::FormFields;
use crate::session::Session;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{Extensions, request::Parts};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    csrf_token: Option<CsrfToken>,
    session: Option<Session>,
    form: Option<Arc<FormFields>>,
    remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token issued or reused for this request (safe methods only)
    pub fn csrf_token(&self) -> Option<&CsrfToken> {
        self.csrf_token.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Urlencoded body fields, parsed once by the CSRF validation layer
    pub fn form(&self) -> Option<&FormFields> {
        self.form.as_deref()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    #[must_use]
    pub fn with_csrf_token(mut self, token: CsrfToken) -> Self {
        self.csrf_token = Some(token);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn with_form(mut self, form: FormFields) -> Self {
        self.form = Some(Arc::new(form));
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Context currently attached to `extensions`, or an empty one
    ///
    /// The peer address is filled in from `ConnectInfo` when the server was
    /// started with connect info.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        let mut ctx = extensions.get::<Self>().cloned().unwrap_or_default();
        if ctx.remote_addr.is_none() {
            ctx.remote_addr = extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
        }
        ctx
    }

    /// Modify the context stored in `extensions`, creating it if needed
    pub fn update(extensions: &mut Extensions, f: impl FnOnce(Self) -> Self) {
        let ctx = Self::from_extensions(extensions);
        extensions.insert(f(ctx));
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}
