//! Access logging.
//!
//! One line per completed request, appended through a [`RotatingLogWriter`]
//! that rotates the file by size and age.

mod config;
mod middleware;
mod writer;

pub use config::{AccessLogConfig, AccessLogConfigBuilder, LogLevel};
pub use middleware::{AccessLogLayer, AccessLogService, build_access_log_layer};
pub use writer::{DEFAULT_MAX_AGE, DEFAULT_MAX_SIZE, RotatingLogWriter, RotationPolicy};
