use super::types::{Store, StoreError, UnitOfWork};
use crate::ledger::VersionRecord;
use crate::utils::now_iso;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, InterruptHandle, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};

/// SQLite backing store.
///
/// The connection sits behind an async mutex; a unit of work holds the lock
/// from `BEGIN` until `COMMIT`/`ROLLBACK`, so units of work never interleave.
/// Migration statements run on the blocking pool and can be interrupted.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    interrupt: InterruptHandle,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(unavailable)?;
        debug!(path = %path.display(), "Opened SQLite store");
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        let interrupt = conn.get_interrupt_handle();
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        }
    }

    /// Check whether a table exists.
    pub async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        table_exists(&conn, table)
    }

    /// Run a query returning a single integer, e.g. `SELECT COUNT(*) FROM t`.
    pub async fn query_i64(&self, sql: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(sql, [], |row| row.get(0)).map_err(query)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let conn = Arc::clone(&self.conn).lock_owned().await;
        conn.execute_batch("BEGIN").map_err(unavailable)?;
        Ok(Box::new(SqliteUnitOfWork {
            tx: Some(OpenTransaction {
                conn,
                finished: false,
            }),
        }))
    }

    fn interrupt(&self) {
        debug!("Interrupting running SQLite statement");
        self.interrupt.interrupt();
    }

    async fn ensure_version_table(&self, table: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                version_id INTEGER NOT NULL,
                is_applied INTEGER NOT NULL,
                tstamp TEXT NOT NULL
            )"
        ))
        .map_err(write)
    }

    async fn has_version_table(&self, table: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        table_exists(&conn, table)
    }

    async fn list_versions(&self, table: &str) -> Result<Vec<VersionRecord>, StoreError> {
        let conn = self.conn.lock().await;
        read_versions(&conn, table)
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, StoreError> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(unavailable)
}

fn read_versions(conn: &Connection, table: &str) -> Result<Vec<VersionRecord>, StoreError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT version_id, is_applied, tstamp FROM {table} ORDER BY id ASC"
        ))
        .map_err(unavailable)?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(unavailable)?;

    let mut records = Vec::new();
    for row in rows {
        let (version_id, is_applied, tstamp) = row.map_err(query)?;
        let applied_at = DateTime::parse_from_rfc3339(&tstamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::Query(format!("bad timestamp '{}': {}", tstamp, e)))?;
        records.push(VersionRecord {
            version_id,
            is_applied,
            applied_at,
        });
    }

    Ok(records)
}

/// The connection guard of an open transaction; rolled back on drop unless
/// finished.
struct OpenTransaction {
    conn: OwnedMutexGuard<Connection>,
    finished: bool,
}

impl Drop for OpenTransaction {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                error!(error = %e, "Rollback of abandoned transaction failed");
            }
        }
    }
}

/// A unit of work over SQLite.
///
/// While a statement runs, the transaction travels with it to the blocking
/// pool. If the caller stops waiting, the statement keeps the transaction and
/// rolls it back when it ends, releasing the connection.
struct SqliteUnitOfWork {
    tx: Option<OpenTransaction>,
}

impl SqliteUnitOfWork {
    fn open(&mut self) -> Result<&mut OpenTransaction, StoreError> {
        self.tx.as_mut().ok_or_else(closed)
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or_else(closed)?;
        let sql = sql.to_string();

        let (tx, result) = tokio::task::spawn_blocking(move || {
            let result = tx.conn.execute_batch(&sql).map_err(write);
            (tx, result)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        self.tx = Some(tx);
        result
    }

    async fn insert_version(
        &mut self,
        table: &str,
        version: i64,
        is_applied: bool,
    ) -> Result<(), StoreError> {
        self.open()?
            .conn
            .execute(
                &format!(
                    "INSERT INTO {table} (version_id, is_applied, tstamp) VALUES (?1, ?2, ?3)"
                ),
                params![version, is_applied, now_iso()],
            )
            .map(|_| ())
            .map_err(write)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        let tx = this.open()?;
        let committed = tx.conn.execute_batch("COMMIT").map_err(write);
        // A failed COMMIT leaves the transaction open; Drop rolls it back.
        tx.finished = committed.is_ok();
        committed
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        match this.tx.as_mut() {
            Some(tx) => {
                tx.finished = true;
                tx.conn.execute_batch("ROLLBACK").map_err(write)
            }
            // An abandoned statement took the transaction and rolls it back.
            None => Ok(()),
        }
    }
}

fn closed() -> StoreError {
    StoreError::Unavailable("transaction is no longer open".to_string())
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn write(e: rusqlite::Error) -> StoreError {
    StoreError::Write(e.to_string())
}

fn query(e: rusqlite::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_version_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.table_exists("history").await.unwrap());

        store.ensure_version_table("history").await.unwrap();
        store.ensure_version_table("history").await.unwrap();
        assert!(store.table_exists("history").await.unwrap());
        assert!(store.list_versions("history").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_version_table("history").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.execute("CREATE TABLE users (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        tx.insert_version("history", 1, true).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.table_exists("users").await.unwrap());
        let records = store.list_versions("history").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version_id, 1);
        assert!(records[0].is_applied);
    }

    #[tokio::test]
    async fn test_rollback_discards() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_version_table("history").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.execute("CREATE TABLE users (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        tx.insert_version("history", 1, true).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(!store.table_exists("users").await.unwrap());
        assert!(store.list_versions("history").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let mut tx = store.begin().await.unwrap();
            tx.execute("CREATE TABLE users (id INTEGER PRIMARY KEY)")
                .await
                .unwrap();
        }
        assert!(!store.table_exists("users").await.unwrap());
    }

    #[tokio::test]
    async fn test_interrupt_stops_running_statement() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut tx = store.begin().await.unwrap();

        let interrupter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                store.interrupt();
            })
        };

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            tx.execute(
                "CREATE TABLE endless AS WITH RECURSIVE c(x) AS \
                 (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) AS n FROM c",
            ),
        )
        .await
        .expect("interrupt should stop the statement");
        interrupter.await.unwrap();

        assert!(matches!(result, Err(StoreError::Write(_))));
        tx.rollback().await.unwrap();
        assert!(!store.table_exists("endless").await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_statement_is_write_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut tx = store.begin().await.unwrap();
        let err = tx.execute("NOT REALLY SQL").await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
    }

    #[tokio::test]
    async fn test_list_versions_missing_table_is_unavailable() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.list_versions("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
