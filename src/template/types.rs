use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Render error: {0}")]
    Custom(String),
}

/// Context for migration templates
/// Placeholders: {{Version}}, {{CamelName}}, {{lookup Values "key"}}
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateContext {
    /// Free-form `key=value` parameters given to `create`.
    pub values: BTreeMap<String, String>,
    /// `add_users` -> `AddUsers`
    pub camel_name: String,
    /// The allocated identifier, exactly as it appears in the file name.
    pub version: String,
}

/// Anything that can turn a [`TemplateContext`] into file contents.
pub trait MigrationTemplate: Send + Sync {
    fn render(&self, context: &TemplateContext) -> Result<String, TemplateError>;
}

impl<F> MigrationTemplate for F
where
    F: Fn(&TemplateContext) -> Result<String, TemplateError> + Send + Sync,
{
    fn render(&self, context: &TemplateContext) -> Result<String, TemplateError> {
        self(context)
    }
}

/// Default template for SQL migrations.
pub const DEFAULT_SQL_TEMPLATE: &str = r#"-- +up
-- +statement-begin
SELECT 'up SQL query';
-- +statement-end

-- +down
-- +statement-begin
SELECT 'down SQL query';
-- +statement-end
"#;

/// Default template for Rust migrations.
pub const DEFAULT_RUST_TEMPLATE: &str = r#"//! Migration {{Version}}: {{CamelName}}
//!
//! Register this migration under this file's name in the
//! `ProceduralRegistry` used to collect migrations.

use waymark::{ActionContext, ActionError, ProceduralMigration, UnitOfWork};

pub struct {{CamelName}};

#[async_trait::async_trait]
impl ProceduralMigration for {{CamelName}} {
    async fn up(&self, tx: &mut dyn UnitOfWork, _ctx: &ActionContext) -> Result<(), ActionError> {
        // This code is executed when the migration is applied.
        let _ = tx;
        Ok(())
    }

    async fn down(&self, tx: &mut dyn UnitOfWork, _ctx: &ActionContext) -> Result<(), ActionError> {
        // This code is executed when the migration is rolled back.
        let _ = tx;
        Ok(())
    }
}
"#;
