use super::CreateError;
use crate::config::NamingMode;
use crate::migration::is_migration_file_name;
use crate::utils::{sequential_version, timestamp_version};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;

/// File names of the migrations in `dir`, sorted. A missing directory has
/// no migrations.
pub async fn list_migration_files(dir: &Path) -> Result<Vec<String>, CreateError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                if is_migration_file_name(name) {
                    names.push(name.to_string());
                }
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Allocate the identifier for a new migration.
///
/// Sequential identifiers are the number of existing migrations plus one;
/// timestamp identifiers are `now` as `YYYYMMDDHHMMSS`.
pub fn allocate_identifier(naming: NamingMode, existing: usize, now: DateTime<Utc>) -> String {
    match naming {
        NamingMode::Sequential => sequential_version(existing as i64 + 1),
        NamingMode::Timestamp => timestamp_version(now),
    }
}
