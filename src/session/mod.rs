//! Session management and storage.
//!
//! A [`SessionManager`] loads a [`Session`] handle for every request from a
//! [`SessionStore`](crate::traits::session::SessionStore), publishes it through
//! the [`RequestContext`](crate::context::RequestContext), and persists it once
//! the handler has run.

mod config;
mod handle;
mod in_memory;
mod layer;

pub use config::SessionConfig;
pub use handle::{ERROR_KEY, FLASH_KEY, FlashMessages, Session, WARNING_KEY};
pub use in_memory::InMemorySessionStore;
pub use layer::{SessionManager, session_middleware};
