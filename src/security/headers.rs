use super::config::SecurityConfig;
use crate::error::{AppError, Result};
use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue, Response, header},
};
use futures::future::BoxFuture;
use std::sync::Arc;
use tower::Service;

/// Build the security headers layer, or `None` when disabled
///
/// Header values are validated once here, so a malformed CSP is a startup
/// error rather than a silently missing header.
pub fn build_security_headers_layer(config: &SecurityConfig) -> Result<Option<SecurityHeadersLayer>> {
    if !config.enabled {
        return Ok(None);
    }

    Ok(Some(SecurityHeadersLayer {
        headers: resolve_headers(config)?.into(),
    }))
}

fn resolve_headers(config: &SecurityConfig) -> Result<Vec<(HeaderName, HeaderValue)>> {
    let mut headers = Vec::new();

    if config.nosniff {
        headers.push((header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")));
    }

    if let Some(frame_options) = config.frame_options {
        headers.push((header::X_FRAME_OPTIONS, HeaderValue::from_static(frame_options.as_str())));
    }

    if config.xss_protection {
        headers.push((header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")));
    }

    if let Some(policy) = config.referrer_policy {
        headers.push((header::REFERRER_POLICY, HeaderValue::from_static(policy.as_str())));
    }

    if let Some(csp) = &config.content_security_policy {
        let value = HeaderValue::from_str(csp)
            .map_err(|e| AppError::config(format!("Invalid Content-Security-Policy: {}", e)))?;
        headers.push((header::CONTENT_SECURITY_POLICY, value));
    }

    if config.hsts_max_age > 0 {
        let value = HeaderValue::from_str(&format!("max-age={}", config.hsts_max_age))
            .map_err(|e| AppError::config(format!("Invalid HSTS value: {}", e)))?;
        headers.push((header::STRICT_TRANSPORT_SECURITY, value));
    }

    Ok(headers)
}

/// Tower layer that sets the configured headers on every response
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S> tower::Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            headers: self.headers.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S> Service<Request> for SecurityHeadersService<S>
where
    S: Service<Request, Response = Response<Body>> + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let headers = self.headers.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.await?;
            let response_headers = response.headers_mut();
            for (name, value) in headers.iter() {
                response_headers.insert(name.clone(), value.clone());
            }
            Ok(response)
        })
    }
}
