use handlebars::{Handlebars, Template};
use std::path::Path;
use tokio::fs;

use super::types::{
    MigrationTemplate, TemplateContext, TemplateError, DEFAULT_RUST_TEMPLATE,
    DEFAULT_SQL_TEMPLATE,
};
use crate::migration::MigrationKind;

/// Handlebars renderer configured for source code: strict about undefined
/// fields, no HTML escaping.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Load a template from disk
    pub async fn load_template(path: &Path) -> Result<String, TemplateError> {
        if path.exists() {
            let content = fs::read_to_string(path).await?;
            Ok(content)
        } else {
            Err(TemplateError::TemplateNotFound(path.display().to_string()))
        }
    }

    /// Render a template string with the given context
    pub fn render(&self, source: &str, context: &TemplateContext) -> Result<String, TemplateError> {
        self.handlebars
            .render_template(source, context)
            .map_err(TemplateError::from)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A handlebars template string, checked for syntax errors up front.
pub struct HandlebarsTemplate {
    engine: TemplateEngine,
    source: String,
}

impl HandlebarsTemplate {
    pub fn new(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        Template::compile(&source)?;
        Ok(Self {
            engine: TemplateEngine::new(),
            source,
        })
    }

    /// Load a custom template file.
    pub async fn from_file(path: &Path) -> Result<Self, TemplateError> {
        Self::new(TemplateEngine::load_template(path).await?)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl MigrationTemplate for HandlebarsTemplate {
    fn render(&self, context: &TemplateContext) -> Result<String, TemplateError> {
        self.engine.render(&self.source, context)
    }
}

/// The built-in template source for a migration kind.
pub fn default_template(kind: MigrationKind) -> &'static str {
    match kind {
        MigrationKind::Script => DEFAULT_SQL_TEMPLATE,
        MigrationKind::Procedural => DEFAULT_RUST_TEMPLATE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn context() -> TemplateContext {
        let mut values = BTreeMap::new();
        values.insert("comment".to_string(), "// hello <world> & co".to_string());
        TemplateContext {
            values,
            camel_name: "AddUsers".to_string(),
            version: "00007".to_string(),
        }
    }

    #[test]
    fn test_context_field_names() {
        let json = serde_json::to_value(context()).unwrap();
        assert!(json.get("Values").is_some());
        assert_eq!(json["CamelName"], "AddUsers");
        assert_eq!(json["Version"], "00007");
    }

    #[test]
    fn test_render_without_escaping() {
        let template =
            HandlebarsTemplate::new("{{lookup Values \"comment\"}}\n{{CamelName}} {{Version}}")
                .unwrap();
        let output = template.render(&context()).unwrap();
        assert_eq!(output, "// hello <world> & co\nAddUsers 00007");
    }

    #[test]
    fn test_malformed_template() {
        let result = HandlebarsTemplate::new("{{#if Version}}never closed");
        assert!(matches!(result, Err(TemplateError::TemplateError(_))));
    }

    #[test]
    fn test_undefined_field() {
        let template = HandlebarsTemplate::new("{{NoSuchField}}").unwrap();
        let result = template.render(&context());
        assert!(matches!(result, Err(TemplateError::RenderError(_))));
    }

    #[test]
    fn test_default_templates_render() {
        let sql = HandlebarsTemplate::new(default_template(MigrationKind::Script))
            .unwrap()
            .render(&context())
            .unwrap();
        assert!(sql.contains("-- +up"));
        assert!(sql.contains("-- +down"));

        let rust = HandlebarsTemplate::new(default_template(MigrationKind::Procedural))
            .unwrap()
            .render(&context())
            .unwrap();
        assert!(rust.contains("pub struct AddUsers;"));
        assert!(rust.contains("impl ProceduralMigration for AddUsers"));
        assert!(rust.contains("&mut dyn UnitOfWork"));
    }

    #[test]
    fn test_closure_template() {
        let template = |ctx: &TemplateContext| -> Result<String, TemplateError> {
            Ok(format!("{}-{}", ctx.version, ctx.camel_name))
        };
        assert_eq!(template.render(&context()).unwrap(), "00007-AddUsers");
    }

    #[tokio::test]
    async fn test_load_missing_template() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = HandlebarsTemplate::from_file(&temp_dir.path().join("nope.hbs")).await;
        assert!(matches!(result, Err(TemplateError::TemplateNotFound(_))));
    }
}
