//! Ordered, de-duplicated collection of migrations.

use super::parser::parse_artifact;
use super::registry::ProceduralRegistry;
use super::types::{Artifact, Migration, MigrationError};
use std::sync::Arc;

/// Migrations sorted ascending by version, with no duplicate versions.
///
/// A collection is never mutated after it is built. Range queries return a
/// new collection sharing the same migrations.
#[derive(Debug, Clone, Default)]
pub struct MigrationCollection {
    migrations: Vec<Arc<Migration>>,
}

impl MigrationCollection {
    /// Parse every artifact, sort by version and reject duplicates.
    ///
    /// Any parse error aborts the build; no partial collection is returned.
    pub fn build(
        artifacts: &[Artifact],
        registry: &ProceduralRegistry,
    ) -> Result<Self, MigrationError> {
        let mut migrations = artifacts
            .iter()
            .map(|artifact| parse_artifact(artifact, registry).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        migrations.sort_by_key(|m| m.version);

        if let Some(pair) = migrations
            .windows(2)
            .find(|pair| pair[0].version == pair[1].version)
        {
            return Err(MigrationError::DuplicateVersion(
                pair[0].version,
                pair[0].name.clone(),
                pair[1].name.clone(),
            ));
        }

        Ok(Self { migrations })
    }

    fn filtered(&self, keep: impl Fn(&Migration) -> bool) -> Self {
        Self {
            migrations: self
                .migrations
                .iter()
                .filter(|m| keep(m))
                .map(Arc::clone)
                .collect(),
        }
    }

    /// The migration with exactly this version.
    pub fn current(&self, version: i64) -> Result<&Arc<Migration>, MigrationError> {
        self.migrations
            .binary_search_by_key(&version, |m| m.version)
            .map(|idx| &self.migrations[idx])
            .map_err(|_| MigrationError::NotFound(version))
    }

    /// Nearest migration with a version strictly greater than `version`.
    pub fn next(&self, version: i64) -> Result<&Arc<Migration>, MigrationError> {
        let idx = self.migrations.partition_point(|m| m.version <= version);
        self.migrations
            .get(idx)
            .ok_or(MigrationError::NoNext(version))
    }

    /// Nearest migration with a version strictly less than `version`.
    pub fn previous(&self, version: i64) -> Result<&Arc<Migration>, MigrationError> {
        let idx = self.migrations.partition_point(|m| m.version < version);
        idx.checked_sub(1)
            .and_then(|idx| self.migrations.get(idx))
            .ok_or(MigrationError::NoPrevious(version))
    }

    /// Versions in `(from, target]`, ascending.
    pub fn up_to(&self, from: i64, target: i64) -> Self {
        self.filtered(|m| m.version > from && m.version <= target)
    }

    /// Versions in `(target, from]`, newest first.
    pub fn down_to(&self, from: i64, target: i64) -> Self {
        let mut range = self.filtered(|m| m.version > target && m.version <= from);
        range.migrations.reverse();
        range
    }

    /// Versions in `[lo, hi]`.
    pub fn between(&self, lo: i64, hi: i64) -> Self {
        self.filtered(|m| m.version >= lo && m.version <= hi)
    }

    pub fn first(&self) -> Option<&Arc<Migration>> {
        self.migrations.first()
    }

    pub fn last(&self) -> Option<&Arc<Migration>> {
        self.migrations.last()
    }

    pub fn contains(&self, version: i64) -> bool {
        self.current(version).is_ok()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Migration>> {
        self.migrations.iter()
    }

    pub fn versions(&self) -> Vec<i64> {
        self.migrations.iter().map(|m| m.version).collect()
    }
}

impl<'a> IntoIterator for &'a MigrationCollection {
    type Item = &'a Arc<Migration>;
    type IntoIter = std::slice::Iter<'a, Arc<Migration>>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.iter()
    }
}
