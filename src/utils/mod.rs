//! Utility functions and helpers.
//!
//! Environment variable lookup shared by every config section.

pub mod env;

pub use env::{get_env_with_prefix, parse_flag};
