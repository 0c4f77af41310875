//! Version ledger: the durable record of applied migrations.
//!
//! History rows are append-only. The latest row for a version decides
//! whether that version is applied, and the current version is the highest
//! applied one (`0` when nothing is applied).

mod types;

pub use types::VersionRecord;

use crate::store::{Store, StoreError, UnitOfWork};
use crate::utils::MIN_VERSION;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Reads and writes the version history table.
#[derive(Clone)]
pub struct VersionLedger {
    store: Arc<dyn Store>,
    table: String,
}

impl VersionLedger {
    /// Create a ledger over `table`. The name is interpolated into SQL, so
    /// only plain identifiers are accepted.
    pub fn new(store: Arc<dyn Store>, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if !TABLE_NAME.is_match(&table) {
            return Err(StoreError::InvalidTable(table));
        }
        Ok(Self { store, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Store the ledger writes to; migrations run against the same handle.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Create the history table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        self.store.ensure_version_table(&self.table).await
    }

    /// Whether the history table exists yet.
    pub async fn exists(&self) -> Result<bool, StoreError> {
        self.store.has_version_table(&self.table).await
    }

    /// Every history row, oldest first.
    pub async fn records(&self) -> Result<Vec<VersionRecord>, StoreError> {
        self.store.list_versions(&self.table).await
    }

    /// Latest record of every currently applied version.
    pub async fn applied(&self) -> Result<BTreeMap<i64, VersionRecord>, StoreError> {
        Ok(latest_applied(self.records().await?))
    }

    /// Highest applied version, or [`MIN_VERSION`] if nothing is applied.
    pub async fn current_version(&self) -> Result<i64, StoreError> {
        let applied = self.applied().await?;
        let current = applied.keys().next_back().copied().unwrap_or(MIN_VERSION);
        debug!(table = %self.table, current, "Read current version");
        Ok(current)
    }

    /// Record an apply inside the migration's unit of work.
    pub async fn record_applied(
        &self,
        tx: &mut dyn UnitOfWork,
        version: i64,
    ) -> Result<(), StoreError> {
        tx.insert_version(&self.table, version, true).await
    }

    /// Record a revert inside the migration's unit of work.
    pub async fn record_reverted(
        &self,
        tx: &mut dyn UnitOfWork,
        version: i64,
    ) -> Result<(), StoreError> {
        tx.insert_version(&self.table, version, false).await
    }
}

/// Fold history rows (oldest first) into the applied set.
fn latest_applied(records: Vec<VersionRecord>) -> BTreeMap<i64, VersionRecord> {
    let mut latest: BTreeMap<i64, VersionRecord> = BTreeMap::new();
    for record in records {
        latest.insert(record.version_id, record);
    }
    latest.retain(|_, record| record.is_applied);
    latest
}
