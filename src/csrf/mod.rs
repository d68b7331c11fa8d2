//! Anti-forgery protection for form posts.

mod config;
mod middleware;
mod token;

pub use config::{CsrfConfig, CsrfConfigBuilder, CsrfFailureMode};
pub use middleware::{
    CsrfProtection, DEFAULT_MAX_BODY_SIZE, TokenGenerator, is_safe_method, issue_token, validate_pair,
    validate_token,
};
pub use token::{CsrfToken, ENCODED_LEN, TOKEN_BYTES, constant_time_eq};
