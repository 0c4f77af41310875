use super::identifier::list_migration_files;
use super::CreateError;
use crate::migration::{parse_version, MigrationError};
use crate::utils::{sequential_version, TIMESTAMP_VERSION_THRESHOLD};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Renumber timestamp-named migrations in `dir` to sequential identifiers.
///
/// Numbering continues after the highest sequential version already present
/// and follows the timestamps' order. Returns `(old, new)` file names.
pub async fn fix_migrations(dir: &Path) -> Result<Vec<(String, String)>, CreateError> {
    if !dir.is_dir() {
        return Err(MigrationError::SourceNotFound(dir.to_path_buf()).into());
    }

    let mut migrations = list_migration_files(dir)
        .await?
        .into_iter()
        .map(|name| Ok((parse_version(&name)?, name)))
        .collect::<Result<Vec<_>, MigrationError>>()?;
    migrations.sort();

    let mut next = migrations
        .iter()
        .map(|(version, _)| *version)
        .filter(|version| *version < TIMESTAMP_VERSION_THRESHOLD)
        .max()
        .unwrap_or(0)
        + 1;

    let mut renamed = Vec::new();
    for (_, name) in migrations
        .iter()
        .filter(|(version, _)| *version >= TIMESTAMP_VERSION_THRESHOLD)
    {
        let prefix_len = name
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(name.len());
        let new_name = format!("{}{}", sequential_version(next), &name[prefix_len..]);

        let target = dir.join(&new_name);
        if target.exists() {
            return Err(CreateError::CreateConflict(new_name));
        }
        fs::rename(dir.join(name), &target).await?;

        info!(from = %name, to = %new_name, "Renamed migration");
        renamed.push((name.clone(), new_name));
        next += 1;
    }

    Ok(renamed)
}
