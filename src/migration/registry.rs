//! Registry of procedural (Rust) migrations.

use super::types::{Artifact, ProceduralMigration};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Procedural migrations keyed by the file name they are known under.
///
/// The registry is an explicit value handed to the parser; nothing registers
/// itself at load time.
#[derive(Clone, Default)]
pub struct ProceduralRegistry {
    migrations: BTreeMap<String, Arc<dyn ProceduralMigration>>,
}

impl ProceduralRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration under `name` (e.g. `00003_backfill_emails.rs`).
    ///
    /// Returns the migration previously registered under that name, if any.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        migration: Arc<dyn ProceduralMigration>,
    ) -> Option<Arc<dyn ProceduralMigration>> {
        self.migrations.insert(name.into(), migration)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProceduralMigration>> {
        self.migrations.get(name).map(Arc::clone)
    }

    /// Registered file names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.migrations.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// One bodiless artifact per registration, for running compiled-in
    /// migrations without any files on disk.
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.migrations
            .keys()
            .map(|name| Artifact::new(name.clone(), String::new()))
            .collect()
    }
}
