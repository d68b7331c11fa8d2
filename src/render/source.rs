//! Template sources: a directory on disk and an in-memory map.

use crate::error::{AppError, Result};
use crate::traits::template::{Layout, TemplateSource};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File suffix of page templates
pub const PAGE_SUFFIX: &str = ".page.hbs";
/// File suffix of layout templates; the part before it is the partial name
pub const LAYOUT_SUFFIX: &str = ".layout.hbs";

/// Pages and layouts read from a single directory
///
/// Pages are `*.page.hbs` files and are addressed by file name
/// (`home.page.hbs`). Layouts are `*.layout.hbs` files, registered as
/// partials under the stem (`base.layout.hbs` becomes `base`).
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_names(&self, suffix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(suffix) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Page names are plain file names; anything that could leave the directory is unknown
fn is_plain_page_name(name: &str) -> bool {
    name.ends_with(PAGE_SUFFIX)
        && !name.contains(['/', '\\'])
        && !name.starts_with('.')
}

impl TemplateSource for DirectorySource {
    fn page_names(&self) -> Result<Vec<String>> {
        self.file_names(PAGE_SUFFIX)
    }

    fn load_page(&self, name: &str) -> Result<String> {
        if !is_plain_page_name(name) {
            return Err(AppError::TemplateNotFound(name.to_string()));
        }

        match std::fs::read_to_string(self.dir.join(name)) {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::TemplateNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn layouts(&self) -> Result<Vec<Layout>> {
        self.file_names(LAYOUT_SUFFIX)?
            .into_iter()
            .map(|file| -> Result<Layout> {
                let body = std::fs::read_to_string(self.dir.join(&file))?;
                let stem = file.trim_end_matches(LAYOUT_SUFFIX);
                Ok(Layout::new(stem, body))
            })
            .collect()
    }
}

/// Pages and layouts held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: BTreeMap<String, String>,
    layouts: Vec<Layout>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(name.into(), body.into());
        self
    }

    #[must_use]
    pub fn with_layout(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.layouts.push(Layout::new(name, body));
        self
    }
}

impl TemplateSource for MemorySource {
    fn page_names(&self) -> Result<Vec<String>> {
        Ok(self.pages.keys().cloned().collect())
    }

    fn load_page(&self, name: &str) -> Result<String> {
        self.pages
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::TemplateNotFound(name.to_string()))
    }

    fn layouts(&self) -> Result<Vec<Layout>> {
        Ok(self.layouts.clone())
    }
}
