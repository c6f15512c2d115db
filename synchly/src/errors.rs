//! Error types for the backup orchestrator
//!
//! Component boundaries return typed errors so the scheduler and the CLI can
//! report the failure kind together with its underlying cause. Plumbing below
//! those boundaries (SQLite, child processes, SSH) uses `anyhow`.

use crate::dump::DbType;
use thiserror::Error;

/// Top-level error for a pipeline run or a CLI command
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dump error: {0}")]
    Dump(#[from] DumpError),

    #[error("Remote sync error: {0}")]
    Remote(#[from] RemoteError),

    /// A trigger fired while the previous run of the same job was still in flight
    #[error("Skipped trigger for job '{job_name}': previous run still active ({running_for})")]
    SchedulerOverlap { job_name: String, running_for: String },

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline for job '{job_name}' panicked: {reason}")]
    Panicked { job_name: String, reason: String },
}

impl BackupError {
    /// Short name of the failure kind, used in notifications and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            BackupError::Config(_) => "ConfigError",
            BackupError::Dump(_) => "DumpError",
            BackupError::Remote(_) => "RemoteError",
            BackupError::SchedulerOverlap { .. } => "SchedulerOverlap",
            BackupError::Storage(_) => "StorageError",
            BackupError::Io(_) => "IoError",
            BackupError::Panicked { .. } => "PipelinePanic",
        }
    }

    /// Process exit code for the CLI, one per failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            BackupError::Config(_) => 2,
            BackupError::Dump(_) => 3,
            BackupError::Remote(_) => 4,
            BackupError::Storage(_) => 5,
            BackupError::Io(_) => 6,
            BackupError::SchedulerOverlap { .. } | BackupError::Panicked { .. } => 1,
        }
    }
}

/// Configuration error variants
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Job '{job_name}' does not exist")]
    JobNotFound { job_name: String },

    #[error("Job '{job_name}' has no {module} configuration, run with --config {module} first")]
    MissingModule { job_name: String, module: String },

    #[error("Stored {module} configuration of job '{job_name}' is invalid: {reason}")]
    InvalidModule {
        job_name: String,
        module: String,
        reason: String,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to load config from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },
}

/// Dump dispatch error variants
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Unsupported database type '{db_type}' (supported: {supported})")]
    UnsupportedAdapter { db_type: String, supported: String },

    #[error("{adapter} adapter failed: {source}")]
    AdapterFailure {
        adapter: DbType,
        #[source]
        source: anyhow::Error,
    },
}

/// Remote transfer error variants
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Connection to {host} failed: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Given directory {path} does not exist on the remote server")]
    PathMissing { path: String },

    #[error("Not a directory, {path}")]
    NotADirectory { path: String },

    #[error("Transfer of {local_path} to {remote_path} failed: {source}")]
    TransferFailed {
        local_path: String,
        remote_path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to delete remote file {remote_path}: {source}")]
    DeleteFailed {
        remote_path: String,
        #[source]
        source: anyhow::Error,
    },
}
