//! Types for the backing-store seam.

use crate::ledger::VersionRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Error types for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid version table name: {0}")]
    InvalidTable(String),
}

/// A single transaction against the backing store.
///
/// Migration actions and the matching ledger write go through the same unit
/// of work, so the schema change and its history row commit or roll back
/// together.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Execute one or more SQL statements.
    async fn execute(&mut self, sql: &str) -> Result<(), StoreError>;

    /// Append a row to the version history table.
    async fn insert_version(
        &mut self,
        table: &str,
        version: i64,
        is_applied: bool,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Connection handle owned by the caller.
///
/// Implementations never pool, retry or reconnect; a connectivity failure is
/// reported as [`StoreError::Unavailable`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Create the version history table if it does not exist yet.
    async fn ensure_version_table(&self, table: &str) -> Result<(), StoreError>;

    /// Whether the version history table exists. Never writes.
    async fn has_version_table(&self, table: &str) -> Result<bool, StoreError>;

    /// Every history row, oldest first.
    async fn list_versions(&self, table: &str) -> Result<Vec<VersionRecord>, StoreError>;

    /// Abort the statement running right now, if the driver can. The unit of
    /// work it belongs to is rolled back.
    fn interrupt(&self) {}
}
