//! Database record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw stored job document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfigRecord {
    pub name: String,
    /// JSON object keyed by module (`db`, `remote_sync`, `notify`) plus module flags
    pub config: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Started,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Started => "started",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "started" => Some(RunStatus::Started),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// One pipeline run of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRunRecord {
    pub id: String,
    pub job_name: String,
    pub status: RunStatus,
    pub archive_name: Option<String>,
    /// Full remote path, set after a successful upload
    pub remote_path: Option<String>,
    pub remote_deleted: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}
