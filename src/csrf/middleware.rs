//! Double-submit cookie CSRF protection.
//!
//! Two middleware functions share one [`CsrfProtection`] state:
//!
//! - [`issue_token`] runs on safe methods. It reuses a well-formed token
//!   cookie or mints a new one, and publishes the token into the
//!   [`RequestContext`] so templates can embed it.
//! - [`validate_token`] runs on every other method. It parses an urlencoded
//!   body once, then requires the token from the `X-CSRF-Token` header or the
//!   `csrf_token` form field to equal the cookie token.
//!
//! The token is not rotated after a successful submission.

use super::{CsrfConfig, CsrfFailureMode, CsrfToken, constant_time_eq};
use crate::context::RequestContext;
use crate::error::{AppError, Result};
use crate::http::{append_set_cookie, get_cookie, read_form, strict_cookie};
use crate::session::ERROR_KEY;
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Default cap on buffered form bodies (1 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Mints a fresh token for [`issue_token`]
pub type TokenGenerator = fn() -> Result<CsrfToken>;

/// Shared state for [`issue_token`] and [`validate_token`]
#[derive(Debug, Clone)]
pub struct CsrfProtection {
    config: Arc<CsrfConfig>,
    secure: bool,
    max_body_size: usize,
    generate: TokenGenerator,
}

impl CsrfProtection {
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
            secure: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            generate: CsrfToken::generate,
        }
    }

    /// Mark the token cookie `Secure` (production)
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Replace the entropy-backed generator
    #[must_use]
    pub fn with_generator(mut self, generate: TokenGenerator) -> Self {
        self.generate = generate;
        self
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Token sent by the client: header first, then form field
    fn submitted_token(&self, request: &Request, ctx: &RequestContext) -> Option<String> {
        let from_header = request
            .headers()
            .get(self.config.header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        from_header.or_else(|| {
            ctx.form()
                .and_then(|form| form.get_non_empty(&self.config.form_field))
                .map(str::to_string)
        })
    }

    fn reject(&self, request: &Request, ctx: &RequestContext, error: AppError) -> Response {
        let remote = ctx
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            remote = %remote,
            error = %error,
            "CSRF validation failed"
        );

        match (self.config.failure_mode, ctx.session()) {
            (CsrfFailureMode::Redirect, Some(session)) => {
                session.put_string(ERROR_KEY, self.config.failure_message.clone());
                Redirect::to(request.uri().path()).into_response()
            }
            _ => error.into_response(),
        }
    }
}

/// True for methods that must not change state: GET, HEAD, OPTIONS, TRACE
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Decide whether a cookie token and a submitted token form a valid pair
///
/// Empty values count as absent. The comparison is constant time.
pub fn validate_pair(cookie: Option<&str>, submitted: Option<&str>) -> Result<()> {
    let cookie = cookie
        .filter(|value| !value.is_empty())
        .ok_or(AppError::TokenMissing("cookie"))?;
    let submitted = submitted
        .filter(|value| !value.is_empty())
        .ok_or(AppError::TokenMissing("request"))?;

    if constant_time_eq(cookie.as_bytes(), submitted.as_bytes()) {
        Ok(())
    } else {
        Err(AppError::TokenMismatch)
    }
}

/// Issue or reuse the token cookie on safe requests
pub async fn issue_token(
    State(csrf): State<CsrfProtection>,
    mut request: Request,
    next: Next,
) -> Response {
    if !is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let existing = get_cookie(request.headers(), &csrf.config.cookie_name)
        .and_then(|value| CsrfToken::parse(&value));

    let (token, fresh) = match existing {
        Some(token) => (token, false),
        None => match (csrf.generate)() {
            Ok(token) => (token, true),
            Err(e) => return e.into_response(),
        },
    };

    RequestContext::update(request.extensions_mut(), |ctx| {
        ctx.with_csrf_token(token.clone())
    });

    let mut response = next.run(request).await;

    if fresh {
        let cookie = strict_cookie(
            csrf.config.cookie_name.clone(),
            token.into_string(),
            csrf.config.max_age(),
            csrf.secure,
        );
        append_set_cookie(response.headers_mut(), &cookie);
    }

    response
}

/// Validate the token pair on unsafe requests
pub async fn validate_token(
    State(csrf): State<CsrfProtection>,
    request: Request,
    next: Next,
) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let (mut request, form) = match read_form(request, csrf.max_body_size).await {
        Ok(parsed) => parsed,
        Err(e) => return e.into_response(),
    };

    if let Some(form) = form {
        RequestContext::update(request.extensions_mut(), |ctx| ctx.with_form(form));
    }
    let ctx = RequestContext::from_extensions(request.extensions());

    let cookie = get_cookie(request.headers(), &csrf.config.cookie_name);
    let submitted = csrf.submitted_token(&request, &ctx);

    match validate_pair(cookie.as_deref(), submitted.as_deref()) {
        Ok(()) => {
            // Forms re-rendered by the handler must carry the same token
            if let Some(token) = cookie.as_deref().and_then(CsrfToken::parse) {
                RequestContext::update(request.extensions_mut(), |ctx| {
                    ctx.with_csrf_token(token)
                });
            }
            next.run(request).await
        }
        Err(e) => csrf.reject(&request, &ctx, e),
    }
}
