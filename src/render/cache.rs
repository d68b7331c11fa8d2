use super::{CompiledTemplate, TemplateData};
use crate::context::RequestContext;
use crate::error::Result;
use crate::traits::template::TemplateSource;
use axum::response::{Html, IntoResponse, Response};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Lazily compiled, shared page templates
///
/// In cached mode each page is compiled at most once: lookups take the read
/// lock, and a miss takes the write lock and checks again before compiling.
/// With caching disabled every render reloads from the source, so template
/// edits show up without a restart.
pub struct TemplateCache {
    source: Arc<dyn TemplateSource>,
    use_cache: bool,
    entries: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
    compiles: AtomicUsize,
}

impl TemplateCache {
    pub fn new(source: Arc<dyn TemplateSource>, use_cache: bool) -> Self {
        Self {
            source,
            use_cache,
            entries: RwLock::new(HashMap::new()),
            compiles: AtomicUsize::new(0),
        }
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Number of compilations performed so far
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    /// Number of cached templates
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compile(&self, name: &str) -> Result<CompiledTemplate> {
        let page = self.source.load_page(name)?;
        let layouts = self.source.layouts()?;
        let compiled = CompiledTemplate::compile(name, &page, &layouts)?;
        self.compiles.fetch_add(1, Ordering::Relaxed);
        Ok(compiled)
    }

    /// Cached template for `name`, compiling it on first use
    pub fn get_or_compile(&self, name: &str) -> Result<Arc<CompiledTemplate>> {
        if !self.use_cache {
            return self.compile(name).map(Arc::new);
        }

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(template) = entries.get(name) {
                tracing::trace!(template = name, "Template cache hit");
                return Ok(template.clone());
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have compiled it while we waited for the write lock
        if let Some(template) = entries.get(name) {
            return Ok(template.clone());
        }

        tracing::debug!(template = name, "Compiling template");
        let template = Arc::new(self.compile(name)?);
        entries.insert(name.to_string(), template.clone());
        Ok(template)
    }

    /// Render `name` into a complete buffer
    pub fn render(&self, name: &str, data: &TemplateData) -> Result<Vec<u8>> {
        self.get_or_compile(name)?.render(data)
    }

    /// Render a page for a request, merging CSRF token and one-shot messages
    /// from the context into `data`
    ///
    /// Errors become a logged 500 with no partial body.
    pub fn render_page(&self, ctx: &RequestContext, name: &str, data: TemplateData) -> Response {
        let data = data.add_default_data(ctx);
        match self.render(name, &data) {
            Ok(body) => Html(body).into_response(),
            Err(e) => e.into_response(),
        }
    }

    /// Compile every page the source knows about
    ///
    /// In cached mode the results are kept; otherwise this only checks that
    /// every page compiles. Returns the number of pages.
    pub fn warm(&self) -> Result<usize> {
        let names = self.source.page_names()?;
        for name in &names {
            self.get_or_compile(name)?;
        }
        tracing::info!(pages = names.len(), cached = self.use_cache, "Templates compiled");
        Ok(names.len())
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("use_cache", &self.use_cache)
            .field("len", &self.len())
            .field("compiles", &self.compile_count())
            .finish_non_exhaustive()
    }
}
