//! Urlencoded form bodies.
//!
//! Unsafe requests are buffered and parsed once, in the CSRF layer, so the
//! token field can be read before the handler runs. The raw bytes are put
//! back afterwards so `axum::Form` keeps working downstream.

use crate::error::{AppError, Result};
use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, header},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};

/// Parsed `application/x-www-form-urlencoded` fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    /// Parse an urlencoded body
    pub fn parse(body: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    /// First value for `name`, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Non-empty value for `name`
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Whether the request declares an urlencoded body
pub fn is_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Buffer at most `limit` bytes of a request body.
///
/// Declared lengths above the limit are rejected before reading; streamed
/// bodies are cut off as soon as they cross it.
pub async fn buffer_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(AppError::PayloadTooLarge { limit });
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(AppError::PayloadTooLarge { limit })
        }
        Err(e) => Err(AppError::bad_request(format!("Failed to read request body: {}", e))),
    }
}

/// Parse an urlencoded request body, returning the rebuilt request and its fields.
///
/// Requests with any other content type pass through untouched with `None`.
pub async fn read_form(request: Request, limit: usize) -> Result<(Request, Option<FormFields>)> {
    if !is_urlencoded(request.headers()) {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = buffer_body(&parts.headers, body, limit).await?;
    let fields = FormFields::parse(&bytes);
    Ok((Request::from_parts(parts, Body::from(bytes)), Some(fields)))
}
