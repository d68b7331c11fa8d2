use crate::context::RequestContext;
use crate::error::{AppError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Session key whose presence marks the visitor as signed in
pub const USER_ID_KEY: &str = "user_id";

/// Values handed from a handler to a page template
///
/// Handlers fill the maps; the renderer fills `csrf_token`, the three one-shot
/// messages and `is_authenticated` from the request context right before
/// rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateData {
    pub string_map: HashMap<String, String>,
    pub int_map: HashMap<String, i64>,
    pub float_map: HashMap<String, f32>,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub csrf_token: String,
    pub flash: String,
    pub warning: String,
    pub error: String,
    pub is_authenticated: bool,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.string_map.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.int_map.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_float(mut self, key: impl Into<String>, value: f32) -> Self {
        self.float_map.insert(key.into(), value);
        self
    }

    /// Add any serializable value under `data.<key>`
    pub fn insert_data<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| {
            AppError::internal(format!("Failed to serialize template data {}: {}", key, e))
        })?;
        self.data.insert(key, value);
        Ok(())
    }

    /// Merge request-scoped defaults into handler data
    ///
    /// Flash, warning and error are popped from the session, so each one is
    /// shown on exactly one rendered page.
    #[must_use]
    pub fn add_default_data(mut self, ctx: &RequestContext) -> Self {
        if let Some(token) = ctx.csrf_token() {
            self.csrf_token = token.to_string();
        }

        if let Some(session) = ctx.session() {
            let messages = session.pop_flash_messages();
            if let Some(flash) = messages.flash {
                self.flash = flash;
            }
            if let Some(warning) = messages.warning {
                self.warning = warning;
            }
            if let Some(error) = messages.error {
                self.error = error;
            }
            self.is_authenticated = session.exists(USER_ID_KEY);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::CsrfToken;
    use crate::session::{ERROR_KEY, FLASH_KEY, Session};
    use std::time::Duration;

    #[test]
    fn test_builders() {
        let mut data = TemplateData::new()
            .with_string("remote_ip", "10.1.1.1")
            .with_int("nights", 3)
            .with_float("rate", 89.5);
        data.insert_data("rooms", &vec!["generals", "majors"]).unwrap();

        assert_eq!(data.string_map["remote_ip"], "10.1.1.1");
        assert_eq!(data.int_map["nights"], 3);
        assert_eq!(data.data["rooms"], serde_json::json!(["generals", "majors"]));
    }

    #[test]
    fn test_default_data_from_context() {
        let token = CsrfToken::generate().unwrap();
        let session = Session::new(Duration::from_secs(60));
        session.put_string(FLASH_KEY, "Reservation saved");
        session.put_string(ERROR_KEY, "Dates unavailable");
        session.put_string(USER_ID_KEY, "7");

        let ctx = RequestContext::new()
            .with_csrf_token(token.clone())
            .with_session(session.clone());
        let data = TemplateData::new().add_default_data(&ctx);

        assert_eq!(data.csrf_token, token.as_str());
        assert_eq!(data.flash, "Reservation saved");
        assert_eq!(data.warning, "");
        assert_eq!(data.error, "Dates unavailable");
        assert!(data.is_authenticated);

        // popped: a second render sees nothing
        let again = TemplateData::new().add_default_data(&ctx);
        assert_eq!(again.flash, "");
        assert_eq!(again.error, "");
    }

    #[test]
    fn test_default_data_without_context() {
        let data = TemplateData::new()
            .with_string("k", "v")
            .add_default_data(&RequestContext::new());
        assert_eq!(data.csrf_token, "");
        assert!(!data.is_authenticated);
        assert_eq!(data.string_map["k"], "v");
    }
}
