mod engine;
mod types;

pub use engine::{default_template, HandlebarsTemplate, TemplateEngine};
pub use types::{
    MigrationTemplate, TemplateContext, TemplateError, DEFAULT_RUST_TEMPLATE,
    DEFAULT_SQL_TEMPLATE,
};
