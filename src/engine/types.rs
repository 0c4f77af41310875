//! Types for the execution engine.

use crate::migration::MigrationDirection;
use chrono::{DateTime, Utc};

/// A migration the engine ran successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    /// File name of the migration.
    pub name: String,
    pub direction: MigrationDirection,
}

/// Result of a mutating engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// Current version before the run.
    pub from_version: i64,
    /// Current version after the run.
    pub to_version: i64,
    /// Migrations that ran, in execution order.
    pub applied: Vec<AppliedMigration>,
}

impl MigrationResult {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applied/pending state of one migration, as reported by `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    /// When the migration was last applied; `None` while pending.
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}
