//! Types for the migration system.

use crate::store::{StoreError, UnitOfWork};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by a migration action (SQL statement or procedural hook).
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Malformed migration identifier in '{0}': expected a positive integer version prefix")]
    MalformedIdentifier(String),

    #[error("Unsupported migration kind '{1}' for '{0}'")]
    UnsupportedKind(String, String),

    #[error("Migration '{0}' has no '-- +up' marker")]
    MissingUpMarker(String),

    #[error("Migration '{0}' has a statement-begin without a matching statement-end")]
    UnterminatedStatement(String),

    #[error("Procedural migration '{0}' is not registered")]
    Unregistered(String),

    #[error("Duplicate migration version {0}: '{1}' and '{2}'")]
    DuplicateVersion(i64, String, String),

    #[error("Migration version {0} not found")]
    NotFound(i64),

    #[error("No migration after version {0}")]
    NoNext(i64),

    #[error("No migration before version {0}")]
    NoPrevious(i64),

    #[error("Unapplied migrations older than the current version: {0:?}")]
    MissingMigrations(Vec<i64>),

    #[error("Migration directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Migration {version} ({name}) failed: {error}")]
    Failed {
        version: i64,
        name: String,
        #[source]
        error: ActionError,
    },

    #[error("Run cancelled before migration {0} completed")]
    Cancelled(i64),
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration.
    Up,
    /// Revert the migration.
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// How a migration's actions are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationKind {
    /// SQL statements between `-- +up` / `-- +down` markers.
    Script,
    /// Rust code registered in a [`crate::migration::ProceduralRegistry`].
    #[default]
    Procedural,
}

impl MigrationKind {
    /// File extension of artifacts of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            MigrationKind::Script => "sql",
            MigrationKind::Procedural => "rs",
        }
    }

    /// Parse a kind token as given to `create`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "sql" => Some(MigrationKind::Script),
            "rs" | "rust" => Some(MigrationKind::Procedural),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A migration file as found in a source: its name and raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub body: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// What a procedural hook gets to know about the current invocation.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub version: i64,
    pub name: String,
    /// Set when the run does not record history.
    pub no_versioning: bool,
}

/// Trait for a migration written in Rust.
///
/// Both hooks default to no-ops, so a migration only implements the
/// directions it needs.
#[async_trait]
pub trait ProceduralMigration: Send + Sync {
    /// Apply the migration.
    async fn up(&self, _tx: &mut dyn UnitOfWork, _ctx: &ActionContext) -> Result<(), ActionError> {
        Ok(())
    }

    /// Revert the migration.
    async fn down(
        &self,
        _tx: &mut dyn UnitOfWork,
        _ctx: &ActionContext,
    ) -> Result<(), ActionError> {
        Ok(())
    }
}

/// The executable part of a migration.
#[derive(Clone)]
pub enum MigrationBody {
    Script { up: Vec<String>, down: Vec<String> },
    Procedural(Arc<dyn ProceduralMigration>),
}

impl fmt::Debug for MigrationBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationBody::Script { up, down } => f
                .debug_struct("Script")
                .field("up", &up.len())
                .field("down", &down.len())
                .finish(),
            MigrationBody::Procedural(_) => f.write_str("Procedural"),
        }
    }
}

/// One versioned, reversible unit of schema change.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    /// File name the migration was parsed from.
    pub name: String,
    pub kind: MigrationKind,
    pub body: MigrationBody,
}

impl Migration {
    /// Run one direction of this migration inside `tx`.
    ///
    /// `no_versioning` is per-invocation state and is only handed through
    /// to procedural hooks; it is never stored on the migration.
    pub async fn run(
        &self,
        direction: MigrationDirection,
        tx: &mut dyn UnitOfWork,
        no_versioning: bool,
    ) -> Result<(), ActionError> {
        match &self.body {
            MigrationBody::Script { up, down } => {
                let statements = match direction {
                    MigrationDirection::Up => up,
                    MigrationDirection::Down => down,
                };
                for statement in statements {
                    tx.execute(statement).await?;
                }
                Ok(())
            }
            MigrationBody::Procedural(procedural) => {
                let ctx = ActionContext {
                    version: self.version,
                    name: self.name.clone(),
                    no_versioning,
                };
                match direction {
                    MigrationDirection::Up => procedural.up(tx, &ctx).await,
                    MigrationDirection::Down => procedural.down(tx, &ctx).await,
                }
            }
        }
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.name)
    }
}
