use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the version history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version_id: i64,
    /// `true` for an apply, `false` for a revert.
    pub is_applied: bool,
    pub applied_at: DateTime<Utc>,
}
