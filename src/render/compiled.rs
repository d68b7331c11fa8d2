use super::TemplateData;
use crate::error::{AppError, Result};
use crate::traits::template::Layout;
use handlebars::Handlebars;

/// A page compiled together with the shared layouts
///
/// Each compiled template owns its own registry: the page is registered under
/// its name and every layout as a partial, so a page opts into a layout with
/// `{{#> base}}{{#*inline "content"}}...{{/inline}}{{/base}}`.
pub struct CompiledTemplate {
    name: String,
    registry: Handlebars<'static>,
}

impl CompiledTemplate {
    pub fn compile(name: &str, page: &str, layouts: &[Layout]) -> Result<Self> {
        let mut registry = Handlebars::new();

        for layout in layouts {
            registry
                .register_partial(&layout.name, layout.body.as_str())
                .map_err(|e| AppError::TemplateCompile {
                    name: layout.name.clone(),
                    reason: e.to_string(),
                })?;
        }

        registry
            .register_template_string(name, page)
            .map_err(|e| AppError::TemplateCompile {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render into a fresh buffer; nothing is returned unless rendering completes
    pub fn render(&self, data: &TemplateData) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.registry
            .render_to_write(&self.name, data, &mut buf)
            .map_err(|e| AppError::TemplateRender {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(buf)
    }
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "<html><body>{{> content}}</body></html>";

    fn render(page: &str, data: &TemplateData) -> Result<String> {
        let compiled = CompiledTemplate::compile("test.page.hbs", page, &[Layout::new("base", BASE)])?;
        Ok(String::from_utf8(compiled.render(data)?).unwrap())
    }

    #[test]
    fn test_page_inside_layout() {
        let page = r#"{{#> base}}{{#*inline "content"}}<h1>{{string_map.title}}</h1>{{/inline}}{{/base}}"#;
        let data = TemplateData::new().with_string("title", "Majors Suite");

        assert_eq!(
            render(page, &data).unwrap(),
            "<html><body><h1>Majors Suite</h1></body></html>"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        let data = TemplateData::new().with_string("name", "<script>");
        assert_eq!(render("{{string_map.name}}", &data).unwrap(), "&lt;script&gt;");
    }

    #[test]
    fn test_token_is_embedded_verbatim() {
        let data = TemplateData {
            csrf_token: "abc-_=".to_string(),
            ..TemplateData::default()
        };
        let html = render(r#"<input name="csrf_token" value="{{{csrf_token}}}">"#, &data).unwrap();
        assert_eq!(html, r#"<input name="csrf_token" value="abc-_=">"#);
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let err = CompiledTemplate::compile("broken.page.hbs", "{{#if flash}}never closed", &[]).unwrap_err();
        assert!(matches!(err, AppError::TemplateCompile { ref name, .. } if name == "broken.page.hbs"));
    }

    #[test]
    fn test_missing_partial_is_render_error() {
        let err = render("{{> nowhere}}", &TemplateData::new()).unwrap_err();
        assert!(matches!(err, AppError::TemplateRender { .. }));
    }
}
