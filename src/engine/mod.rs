//! Execution engine: moves a database between migration versions.
//!
//! # Overview
//!
//! - The [`MigrationExecutor`] computes the ordered sequence of migrations a
//!   command needs (`up`, `up_to`, `down_to`, `redo`, ...)
//! - Every migration runs in its own unit of work together with its ledger
//!   write, so schema and history commit or roll back as one
//! - The first failure rolls back its unit of work and stops the run; earlier
//!   migrations stay committed and later ones are never attempted
//! - A [`tokio_util::sync::CancellationToken`] stops a run between or during
//!   migrations with the same guarantees
//!
//! # Usage
//!
//! ```ignore
//! let executor = MigrationExecutor::new(migrations, ledger, RunOptions::default());
//! let result = executor.up().await?;
//! ```

mod executor;
mod types;

pub use executor::MigrationExecutor;
pub use types::{AppliedMigration, MigrationResult, MigrationStatus};
