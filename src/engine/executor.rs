//! Migration executor for running migrations.

use super::types::{AppliedMigration, MigrationResult, MigrationStatus};
use crate::config::RunOptions;
use crate::ledger::{VersionLedger, VersionRecord};
use crate::migration::{
    ActionError, Migration, MigrationCollection, MigrationDirection, MigrationError,
};
use crate::store::UnitOfWork;
use crate::utils::{MAX_VERSION, MIN_VERSION};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Executor for running migrations.
///
/// The executor takes a collection of migrations and a ledger and provides
/// one method per engine command.
pub struct MigrationExecutor {
    migrations: MigrationCollection,
    ledger: VersionLedger,
    options: RunOptions,
    cancel: CancellationToken,
}

impl MigrationExecutor {
    /// Create a new executor over `migrations`, recording history in `ledger`.
    pub fn new(migrations: MigrationCollection, ledger: VersionLedger, options: RunOptions) -> Self {
        Self {
            migrations,
            ledger,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop runs when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn migrations(&self) -> &MigrationCollection {
        &self.migrations
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Apply every pending migration.
    pub async fn up(&self) -> Result<MigrationResult, MigrationError> {
        self.up_to(MAX_VERSION).await
    }

    /// Apply pending migrations up to and including `target`.
    ///
    /// A target between two versions applies everything below it.
    pub async fn up_to(&self, target: i64) -> Result<MigrationResult, MigrationError> {
        let (current, plan) = self.plan_up(target).await?;
        self.run_sequence(current, plan, MigrationDirection::Up).await
    }

    /// Apply only the next pending migration.
    pub async fn up_by_one(&self) -> Result<MigrationResult, MigrationError> {
        let (current, mut plan) = self.plan_up(MAX_VERSION).await?;
        if plan.is_empty() {
            return Err(MigrationError::NoNext(current));
        }
        plan.truncate(1);
        self.run_sequence(current, plan, MigrationDirection::Up).await
    }

    /// Revert the current migration.
    pub async fn down(&self) -> Result<MigrationResult, MigrationError> {
        let (current, mut plan) = self.plan_down(MIN_VERSION).await?;
        if plan.is_empty() {
            return Err(MigrationError::NoPrevious(current));
        }
        plan.truncate(1);
        self.run_sequence(current, plan, MigrationDirection::Down).await
    }

    /// Revert every applied migration newer than `target`, newest first.
    pub async fn down_to(&self, target: i64) -> Result<MigrationResult, MigrationError> {
        let (current, plan) = self.plan_down(target).await?;
        self.run_sequence(current, plan, MigrationDirection::Down).await
    }

    /// Revert every applied migration.
    pub async fn reset(&self) -> Result<MigrationResult, MigrationError> {
        self.down_to(MIN_VERSION).await
    }

    /// Revert the current migration and immediately apply it again.
    ///
    /// Down and Up run as two units of work. If Up fails the database is
    /// left in the reverted state.
    pub async fn redo(&self) -> Result<MigrationResult, MigrationError> {
        let current = if self.options.no_versioning {
            self.migrations
                .last()
                .map(|m| m.version)
                .ok_or(MigrationError::NotFound(MIN_VERSION))?
        } else {
            let applied = self.applied().await?;
            self.effective_current(&applied)
        };

        let migration = Arc::clone(self.migrations.current(current)?);
        info!(version = current, name = %migration.name, "Redoing migration");

        self.run_one(&migration, MigrationDirection::Down).await?;
        self.run_one(&migration, MigrationDirection::Up).await?;

        Ok(MigrationResult {
            from_version: current,
            to_version: current,
            applied: vec![
                applied_migration(&migration, MigrationDirection::Down),
                applied_migration(&migration, MigrationDirection::Up),
            ],
        })
    }

    /// Applied/pending state of every migration, oldest first.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let applied = if self.options.no_versioning {
            BTreeMap::new()
        } else {
            self.read_applied().await?
        };

        for version in applied.keys().filter(|v| !self.migrations.contains(**v)) {
            warn!(version, "Applied version has no migration file");
        }

        Ok(self
            .migrations
            .iter()
            .map(|m| MigrationStatus {
                version: m.version,
                name: m.name.clone(),
                applied_at: applied.get(&m.version).map(|r| r.applied_at),
            })
            .collect())
    }

    /// The current version: from the ledger, or the newest migration when
    /// running without versioning.
    pub async fn version(&self) -> Result<i64, MigrationError> {
        if self.options.no_versioning {
            return Ok(self
                .migrations
                .last()
                .map(|m| m.version)
                .unwrap_or(MIN_VERSION));
        }

        if !self.ledger.exists().await? {
            return Ok(MIN_VERSION);
        }
        Ok(self.ledger.current_version().await?)
    }

    /// Applied set for commands that write; creates the history table.
    async fn applied(&self) -> Result<BTreeMap<i64, VersionRecord>, MigrationError> {
        self.ledger.ensure_table().await?;
        Ok(self.ledger.applied().await?)
    }

    /// Applied set for read-only commands; a missing table means nothing
    /// is applied.
    async fn read_applied(&self) -> Result<BTreeMap<i64, VersionRecord>, MigrationError> {
        if !self.ledger.exists().await? {
            return Ok(BTreeMap::new());
        }
        Ok(self.ledger.applied().await?)
    }

    /// Current version as far as this collection is concerned. With
    /// `allow_missing`, applied versions without a migration file are
    /// ignored.
    fn effective_current(&self, applied: &BTreeMap<i64, VersionRecord>) -> i64 {
        applied
            .keys()
            .rev()
            .copied()
            .find(|v| !self.options.allow_missing || self.migrations.contains(*v))
            .unwrap_or(MIN_VERSION)
    }

    /// Current version and the migrations to apply to reach `target`.
    async fn plan_up(&self, target: i64) -> Result<(i64, Vec<Arc<Migration>>), MigrationError> {
        if self.options.no_versioning {
            let plan = self.migrations.up_to(MIN_VERSION, target);
            return Ok((MIN_VERSION, plan.iter().map(Arc::clone).collect()));
        }

        let applied = self.applied().await?;
        let current = applied.keys().next_back().copied().unwrap_or(MIN_VERSION);

        let missing: Vec<Arc<Migration>> = self
            .migrations
            .iter()
            .filter(|m| m.version < current && m.version <= target)
            .filter(|m| !applied.contains_key(&m.version))
            .map(Arc::clone)
            .collect();

        if !missing.is_empty() && !self.options.allow_missing {
            return Err(MigrationError::MissingMigrations(
                missing.iter().map(|m| m.version).collect(),
            ));
        }

        let mut plan = missing;
        plan.extend(self.migrations.up_to(current, target).iter().map(Arc::clone));

        debug!(
            current,
            target,
            count = plan.len(),
            "Planned forward migrations"
        );
        Ok((current, plan))
    }

    /// Current version and the migrations to revert to reach `target`,
    /// newest first.
    async fn plan_down(&self, target: i64) -> Result<(i64, Vec<Arc<Migration>>), MigrationError> {
        if self.options.no_versioning {
            let current = self
                .migrations
                .last()
                .map(|m| m.version)
                .unwrap_or(MIN_VERSION);
            let plan = self.migrations.down_to(current, target);
            return Ok((current, plan.iter().map(Arc::clone).collect()));
        }

        let applied = self.applied().await?;
        let current = applied.keys().next_back().copied().unwrap_or(MIN_VERSION);

        let mut plan = Vec::new();
        for &version in applied.keys().rev().filter(|v| **v > target) {
            match self.migrations.current(version) {
                Ok(migration) => plan.push(Arc::clone(migration)),
                Err(_) if self.options.allow_missing => {
                    warn!(version, "Skipping applied version with no migration file");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            current,
            target,
            count = plan.len(),
            "Planned reverse migrations"
        );
        Ok((current, plan))
    }

    async fn run_sequence(
        &self,
        from_version: i64,
        plan: Vec<Arc<Migration>>,
        direction: MigrationDirection,
    ) -> Result<MigrationResult, MigrationError> {
        if plan.is_empty() {
            info!(version = from_version, "No migrations to run");
            return Ok(MigrationResult {
                from_version,
                to_version: from_version,
                applied: vec![],
            });
        }

        let mut applied = Vec::with_capacity(plan.len());
        for migration in &plan {
            self.run_one(migration, direction).await?;
            applied.push(applied_migration(migration, direction));
        }

        let to_version = if self.options.no_versioning {
            match (direction, plan.last()) {
                (MigrationDirection::Up, Some(last)) => last.version,
                (MigrationDirection::Down, Some(last)) => self
                    .migrations
                    .previous(last.version)
                    .map(|m| m.version)
                    .unwrap_or(MIN_VERSION),
                (_, None) => from_version,
            }
        } else {
            self.ledger.current_version().await?
        };

        info!(
            from = from_version,
            to = to_version,
            count = applied.len(),
            "Migration run completed"
        );

        Ok(MigrationResult {
            from_version,
            to_version,
            applied,
        })
    }

    /// Run one direction of one migration in its own unit of work.
    async fn run_one(
        &self,
        migration: &Migration,
        direction: MigrationDirection,
    ) -> Result<(), MigrationError> {
        if self.cancel.is_cancelled() {
            return Err(MigrationError::Cancelled(migration.version));
        }

        let started = Instant::now();
        let mut tx = self.ledger.store().begin().await?;

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.ledger.store().interrupt();
                Err(MigrationError::Cancelled(migration.version))
            }
            result = self.apply(migration, direction, tx.as_mut()) => result,
        };

        if let Err(e) = outcome {
            error!(
                version = migration.version,
                name = %migration.name,
                direction = %direction,
                error = %e,
                "Migration failed, rolling back"
            );
            if let Err(rollback_err) = tx.rollback().await {
                error!(
                    version = migration.version,
                    error = %rollback_err,
                    "Rollback failed"
                );
            }
            return Err(e);
        }

        tx.commit().await.map_err(|e| MigrationError::Failed {
            version: migration.version,
            name: migration.name.clone(),
            error: Box::new(e),
        })?;

        info!(
            version = migration.version,
            name = %migration.name,
            direction = %direction,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Migrated"
        );
        Ok(())
    }

    /// The action plus its ledger write, inside `tx`.
    async fn apply(
        &self,
        migration: &Migration,
        direction: MigrationDirection,
        tx: &mut dyn UnitOfWork,
    ) -> Result<(), MigrationError> {
        let no_versioning = self.options.no_versioning;
        let failed = |error: ActionError| MigrationError::Failed {
            version: migration.version,
            name: migration.name.clone(),
            error,
        };

        migration
            .run(direction, &mut *tx, no_versioning)
            .await
            .map_err(failed)?;

        if !no_versioning {
            let recorded = match direction {
                MigrationDirection::Up => {
                    self.ledger.record_applied(&mut *tx, migration.version).await
                }
                MigrationDirection::Down => {
                    self.ledger.record_reverted(&mut *tx, migration.version).await
                }
            };
            recorded.map_err(|e| failed(Box::new(e)))?;
        }

        Ok(())
    }
}

fn applied_migration(migration: &Migration, direction: MigrationDirection) -> AppliedMigration {
    AppliedMigration {
        version: migration.version,
        name: migration.name.clone(),
        direction,
    }
}
