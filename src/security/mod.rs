//! Security response headers.

mod config;
mod headers;

pub use config::{FrameOptions, ReferrerPolicy, SecurityConfig, SecurityConfigBuilder};
pub use headers::{SecurityHeadersLayer, SecurityHeadersService, build_security_headers_layer};
