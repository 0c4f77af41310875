#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;
use waymark::{SqliteStore, Store};

/// Create a temporary directory for a test
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Should create temp dir")
}

/// Create `dir/migrations` and return its path
pub async fn init_migrations_dir(dir: &Path) -> PathBuf {
    let migrations = dir.join("migrations");
    fs::create_dir_all(&migrations)
        .await
        .expect("Should create migrations dir");
    migrations
}

/// A SQL migration that creates `table` and drops it again on the way down
pub fn table_migration(table: &str) -> String {
    format!(
        "-- +up\nCREATE TABLE {table} (id INTEGER PRIMARY KEY);\n\n-- +down\nDROP TABLE {table};\n"
    )
}

/// Write a SQL migration file that creates `table`
pub async fn write_table_migration(dir: &Path, file_name: &str, table: &str) {
    fs::write(dir.join(file_name), table_migration(table))
        .await
        .expect("Should write migration file");
}

/// An in-memory SQLite store, both as the concrete type and as a trait object
pub fn memory_store() -> (Arc<SqliteStore>, Arc<dyn Store>) {
    let sqlite = Arc::new(SqliteStore::open_in_memory().expect("Should open in-memory store"));
    let store: Arc<dyn Store> = sqlite.clone();
    (sqlite, store)
}
