//! Creating new migration files and renumbering existing ones.
//!
//! Creation always writes to the real filesystem, even when migrations are
//! otherwise read from an embedded source.

mod artifact;
mod fix;
mod identifier;

pub use artifact::{create_migration, CreateOptions, CreateResult};
pub use fix::fix_migrations;
pub use identifier::{allocate_identifier, list_migration_files};

use crate::migration::MigrationError;
use crate::template::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CreateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),

    #[error("Migration error: {0}")]
    MigrationError(#[from] MigrationError),

    #[error("Migration name '{0}' has no usable characters")]
    InvalidName(String),

    #[error("Migration already exists: {0}")]
    CreateConflict(String),
}
