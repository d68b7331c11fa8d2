//! Page rendering.
//!
//! [`TemplateCache`] compiles pages from a
//! [`TemplateSource`](crate::traits::template::TemplateSource) on first use
//! and renders them against [`TemplateData`].

mod cache;
mod compiled;
mod data;
mod source;

pub use cache::TemplateCache;
pub use compiled::CompiledTemplate;
pub use data::{TemplateData, USER_ID_KEY};
pub use source::{DirectorySource, LAYOUT_SUFFIX, MemorySource, PAGE_SUFFIX};
