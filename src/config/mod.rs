use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "waymark.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// How `create` allocates identifiers for new migration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamingMode {
    /// `YYYYMMDDHHMMSS` of the creation time.
    #[default]
    Timestamp,
    /// Count of existing migrations plus one, zero-padded to five digits.
    Sequential,
}

/// Per-invocation options consumed by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Run actions without reading or writing the version ledger.
    #[serde(default)]
    pub no_versioning: bool,
    /// Apply unapplied migrations older than the current version, and skip
    /// ledger entries that have no migration file.
    #[serde(default)]
    pub allow_missing: bool,
}

fn default_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_table() -> String {
    "waymark_db_version".to_string()
}

/// Waymark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding migration files.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Name of the version history table.
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub naming: NamingMode,
    #[serde(default)]
    pub options: RunOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            table: default_table(),
            naming: NamingMode::default(),
            options: RunOptions::default(),
        }
    }
}

/// Read the configuration file
pub async fn read_config(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dir, PathBuf::from("migrations"));
        assert_eq!(config.table, "waymark_db_version");
        assert_eq!(config.naming, NamingMode::Timestamp);
        assert!(!config.options.no_versioning);
        assert!(!config.options.allow_missing);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"naming": "sequential", "options": {"allowMissing": true}}"#)
                .unwrap();
        assert_eq!(config.naming, NamingMode::Sequential);
        assert!(config.options.allow_missing);
        assert!(!config.options.no_versioning);
        assert_eq!(config.table, "waymark_db_version");
    }

    #[tokio::test]
    async fn test_read_missing_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = read_config(&temp_dir.path().join(CONFIG_FILE)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        let config = Config {
            dir: PathBuf::from("db/migrations"),
            table: "schema_history".to_string(),
            naming: NamingMode::Sequential,
            options: RunOptions {
                no_versioning: true,
                allow_missing: false,
            },
        };

        write_config(&path, &config).await.unwrap();
        let loaded = read_config(&path).await.unwrap().unwrap();
        assert_eq!(loaded, config);
    }
}
