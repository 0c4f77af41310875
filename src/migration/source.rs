//! Where migration artifacts come from.

use super::collection::MigrationCollection;
use super::registry::ProceduralRegistry;
use super::types::{Artifact, MigrationError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Read-only listing of migration artifacts.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Every candidate migration artifact.
    async fn list(&self) -> Result<Vec<Artifact>, MigrationError>;
}

/// Migrations stored as files in a directory.
///
/// Only the top level is read. Files whose name does not start with a digit
/// (README, `mod.rs`, dotfiles) are not migrations and are skipped.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Whether a file name looks like a migration artifact.
pub fn is_migration_file_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[async_trait]
impl MigrationSource for DirSource {
    async fn list(&self) -> Result<Vec<Artifact>, MigrationError> {
        if !self.dir.is_dir() {
            return Err(MigrationError::SourceNotFound(self.dir.clone()));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_migration_file_name(name) {
                    paths.push((name.to_string(), entry.path().to_path_buf()));
                }
            }
        }

        let mut artifacts = Vec::with_capacity(paths.len());
        for (name, path) in paths {
            let body = fs::read_to_string(&path).await?;
            artifacts.push(Artifact { name, body });
        }

        debug!(dir = %self.dir.display(), count = artifacts.len(), "Listed migration files");
        Ok(artifacts)
    }
}

/// Migrations compiled into the binary, e.g. with `include_str!`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    artifacts: Vec<Artifact>,
}

impl EmbeddedSource {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self { artifacts }
    }

    /// Build from `(file name, contents)` pairs.
    pub fn from_static(files: &[(&str, &str)]) -> Self {
        Self::new(
            files
                .iter()
                .map(|(name, body)| Artifact::new(*name, *body))
                .collect(),
        )
    }
}

#[async_trait]
impl MigrationSource for EmbeddedSource {
    async fn list(&self) -> Result<Vec<Artifact>, MigrationError> {
        Ok(self
            .artifacts
            .iter()
            .filter(|a| is_migration_file_name(&a.name))
            .cloned()
            .collect())
    }
}

/// List `source`, build a collection and keep versions in `[lo, hi]`.
pub async fn collect_migrations(
    source: &dyn MigrationSource,
    registry: &ProceduralRegistry,
    lo: i64,
    hi: i64,
) -> Result<MigrationCollection, MigrationError> {
    let artifacts = source.list().await?;
    let collection = MigrationCollection::build(&artifacts, registry)?;
    Ok(collection.between(lo, hi))
}
