//! Template source trait
//!
//! A source knows which page templates exist and hands out their bodies plus
//! the shared layout fragments every page is compiled together with.

use crate::error::Result;

/// A shared layout fragment, registered as a partial under `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: String,
    pub body: String,
}

impl Layout {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Where page bodies and layouts come from
pub trait TemplateSource: Send + Sync {
    /// Names of every page this source can load
    fn page_names(&self) -> Result<Vec<String>>;

    /// Body of the named page
    ///
    /// Returns [`AppError::TemplateNotFound`](crate::AppError::TemplateNotFound)
    /// for unknown names.
    fn load_page(&self, name: &str) -> Result<String>;

    /// Shared layout fragments
    fn layouts(&self) -> Result<Vec<Layout>>;
}
