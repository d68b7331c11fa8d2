//! Cookie helpers shared by the session and CSRF layers.

use axum::http::{HeaderMap, HeaderValue, header};
use cookie::{Cookie, SameSite};
use std::time::Duration;

/// Find a cookie value by name across all `Cookie` headers.
///
/// The first occurrence wins. Malformed pairs are skipped.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(|parsed| parsed.ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Build a host-only, strict same-site, HTTP-only cookie
pub fn strict_cookie(
    name: impl Into<String>,
    value: impl Into<String>,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.into(), value.into()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(cookie::time::Duration::seconds(
            i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX),
        ))
        .build()
}

/// Append a `Set-Cookie` header without clobbering cookies set by other layers
pub fn append_set_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => {
            tracing::error!(cookie = cookie.name(), error = %e, "Cookie is not a valid header value");
        }
    }
}
