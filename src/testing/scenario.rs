//! Fluent in-process requests against a router
//!
//! Cookies set by one response can be fed into the next request, which is
//! what the session and CSRF layers need to be exercised end to end.
//!
//! # Example
//!
//! ```rust,ignore
//! let first = testing::get(router.clone(), "/search-availability").execute().await.assert_ok();
//! let token = first.set_cookie("__csrf_token").unwrap();
//!
//! testing::post(router, "/search-availability")
//!     .cookies(&first.cookies())
//!     .form(&[("csrf_token", &token), ("start_date", "2026-07-01"), ("end_date", "2026-07-04")])
//!     .execute()
//!     .await
//!     .assert_ok();
//! ```

use axum::{
    Router,
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header},
};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use tower::ServiceExt;

/// Request under construction
pub struct Scenario {
    app: Router,
    request: Request<Body>,
    cookies: Vec<(String, String)>,
}

impl Scenario {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            request: Request::builder()
                .method(Method::GET)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
            cookies: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        *self.request.method_mut() = method;
        self
    }

    pub fn uri(mut self, uri: &str) -> Self {
        *self.request.uri_mut() = uri.parse().unwrap();
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers_mut().insert(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }

    /// Send a cookie; repeated calls accumulate
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// Send every cookie in `cookies`
    pub fn cookies(mut self, cookies: &[(String, String)]) -> Self {
        self.cookies.extend(cookies.iter().cloned());
        self
    }

    /// Urlencoded body with the matching content type
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        *self.request.body_mut() = Body::from(body);
        self.request.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self
    }

    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        *self.request.body_mut() = Body::from(body.into());
        self
    }

    /// Pretend the request arrived from `addr`
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.request.extensions_mut().insert(ConnectInfo(addr));
        self
    }

    /// Run the request and buffer the whole response
    pub async fn execute(mut self) -> ScenarioAssert {
        if !self.cookies.is_empty() {
            let header_value = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            self.request
                .headers_mut()
                .insert(header::COOKIE, HeaderValue::from_str(&header_value).unwrap());
        }

        let response = self.app.oneshot(self.request).await.unwrap();
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

        ScenarioAssert {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

/// Buffered response with assertion helpers
#[derive(Debug)]
pub struct ScenarioAssert {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ScenarioAssert {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.body_string()
        );
        self
    }

    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_forbidden(self) -> Self {
        self.assert_status(StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    pub fn assert_server_error(self) -> Self {
        self.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Assert a `303 See Other` to `location`
    pub fn assert_redirect_to(self, location: &str) -> Self {
        let this = self.assert_status(StatusCode::SEE_OTHER);
        this.assert_header(header::LOCATION.as_str(), location)
    }

    pub fn assert_header(self, key: &str, expected: &str) -> Self {
        let value = self
            .headers
            .get(key)
            .unwrap_or_else(|| panic!("Header '{}' not found", key))
            .to_str()
            .unwrap();
        assert_eq!(value, expected, "Header '{}' value mismatch", key);
        self
    }

    pub fn assert_no_header(self, key: &str) -> Self {
        assert!(
            self.headers.get(key).is_none(),
            "Header '{}' should be absent",
            key
        );
        self
    }

    /// Raw `Set-Cookie` line for cookie `name`
    pub fn set_cookie_header(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|line| line.starts_with(&prefix))
            .map(str::to_string)
    }

    /// Value of cookie `name` set by this response
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        self.set_cookie_header(name).and_then(|line| {
            let pair = line.split(';').next()?;
            let (_, value) = pair.split_once('=')?;
            Some(value.to_string())
        })
    }

    /// Every cookie set by this response, ready for [`Scenario::cookies`]
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|line| {
                let pair = line.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                Some((name.trim().to_string(), value.to_string()))
            })
            .collect()
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    pub fn assert_contains(self, text: &str) -> Self {
        let body = self.body_string();
        assert!(
            body.contains(text),
            "Response body does not contain '{}'. Body: {}",
            text,
            body
        );
        self
    }

    pub fn assert_not_contains(self, text: &str) -> Self {
        let body = self.body_string();
        assert!(
            !body.contains(text),
            "Response body should not contain '{}'. Body: {}",
            text,
            body
        );
        self
    }

    /// Value of the first `name="csrf_token"` hidden input in an HTML body
    pub fn form_token(&self) -> Option<String> {
        let body = self.body_string();
        let start = body.find(r#"name="csrf_token""#)?;
        let rest = &body[start..];
        let value_start = rest.find(r#"value=""#)? + r#"value=""#.len();
        let value_end = rest[value_start..].find('"')?;
        Some(rest[value_start..value_start + value_end].to_string())
    }
}

pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::GET).uri(uri)
}

pub fn post(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::POST).uri(uri)
}

pub fn put(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::PUT).uri(uri)
}

pub fn delete(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::DELETE).uri(uri)
}
