use super::identifier::{allocate_identifier, list_migration_files};
use super::CreateError;
use crate::config::NamingMode;
use crate::migration::{parse_version, MigrationKind};
use crate::template::{default_template, HandlebarsTemplate, MigrationTemplate, TemplateContext};
use crate::utils::{camel_name, snake_name};
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Options for creating a migration
#[derive(Clone, Default)]
pub struct CreateOptions {
    pub name: String,
    pub kind: MigrationKind,
    /// Free-form parameters, available to templates as `Values`.
    pub values: BTreeMap<String, String>,
    /// Custom template. `None` = built-in template for `kind`.
    pub template: Option<Arc<dyn MigrationTemplate>>,
}

/// Result of migration creation
#[derive(Debug, Clone)]
pub struct CreateResult {
    pub version: String,
    pub file_name: String,
    pub path: PathBuf,
}

/// Create a new migration file in `dir`.
///
/// The directory is created if needed. An existing migration with the same
/// version or file name is never overwritten.
pub async fn create_migration(
    dir: &Path,
    naming: NamingMode,
    options: CreateOptions,
) -> Result<CreateResult, CreateError> {
    let snake = snake_name(&options.name);
    if snake.is_empty() {
        return Err(CreateError::InvalidName(options.name));
    }

    fs::create_dir_all(dir).await?;

    let existing = list_migration_files(dir).await?;
    let version = allocate_identifier(naming, existing.len(), Utc::now());

    // Timestamp identifiers collide within the same second; sequential ones
    // collide once a file has been removed. Either way, refuse.
    let numeric = parse_version(&version)?;
    if let Some(clash) = existing
        .iter()
        .find(|name| parse_version(name).ok() == Some(numeric))
    {
        return Err(CreateError::CreateConflict(clash.clone()));
    }

    let file_name = format!("{}_{}.{}", version, snake, options.kind.extension());
    let context = TemplateContext {
        values: options.values,
        camel_name: camel_name(&options.name),
        version: version.clone(),
    };

    let content = match &options.template {
        Some(template) => template.render(&context)?,
        None => HandlebarsTemplate::new(default_template(options.kind))?.render(&context)?,
    };

    let path = dir.join(&file_name);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => CreateError::CreateConflict(path.display().to_string()),
            _ => CreateError::IoError(e),
        })?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;

    info!(path = %path.display(), kind = %options.kind, "Created new migration");

    Ok(CreateResult {
        version,
        file_name,
        path,
    })
}
