use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// The main error type for the request pipeline
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Entropy source failed: {0}")]
    RandomSource(String),

    #[error("CSRF token missing: {0}")]
    TokenMissing(&'static str),

    #[error("CSRF token mismatch")]
    TokenMismatch,

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template compile error in {name}: {reason}")]
    TemplateCompile { name: String, reason: String },

    #[error("Template render error in {name}: {reason}")]
    TemplateRender { name: String, reason: String },

    #[error("Log rotation failed: {0}")]
    Rotation(String),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the two CSRF validation failures
    pub fn is_csrf_failure(&self) -> bool {
        matches!(self, Self::TokenMissing(_) | Self::TokenMismatch)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TokenMissing(_) | Self::TokenMismatch | Self::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RandomSource(_)
            | Self::TemplateNotFound(_)
            | Self::TemplateCompile { .. }
            | Self::TemplateRender { .. }
            | Self::Rotation(_)
            | Self::Session(_)
            | Self::Config(_)
            | Self::Internal(_)
            | Self::Io(_)
            | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to put on the wire.
    ///
    /// Client errors keep their text; server errors collapse to the status
    /// reason so template paths and I/O details stay in the server log.
    fn safe_message(&self) -> String {
        match self {
            Self::TokenMissing(_) | Self::TokenMismatch => {
                "Forbidden: Invalid CSRF token".to_string()
            }
            Self::PayloadTooLarge { .. } => self.to_string(),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::Forbidden(msg) => format!("Forbidden: {}", msg),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::warn!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request rejected"
            );
        }

        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (header::HeaderName::from_static("x-error-id"), error_id),
            ],
            self.safe_message(),
        )
            .into_response()
    }
}

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, AppError>;
