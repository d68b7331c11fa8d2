//! Trait definitions for the pipeline's external collaborators
//!
//! The core depends only on these contracts: a session store that persists
//! key/value state between requests, and a template source that lists page
//! names and hands out page bodies and shared layouts.

pub mod session;
pub mod template;
