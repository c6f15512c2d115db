//! Database layer for the backup orchestrator.
//!
//! SQLite persistence for:
//! - Job documents (one JSON document per job holding its module configs)
//! - The job registry (job name -> enabled)
//! - Backup run history (used for remote retention and auditing)
//!
//! Submodules:
//! - `records` - record types
//! - `jobs` - job document and registry operations
//! - `runs` - backup run history

mod jobs;
mod records;
mod runs;

pub use records::*;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, error, info};

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        info!("Opening job database at {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!("Failed to create database directory {:?}: {}", parent, e);
                    return Err(e.into());
                }
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database {}: {}", database_url, e);
                e
            })?;

        let database = Self { pool };
        database.initialize_tables().await?;
        info!("Job database ready");
        Ok(database)
    }

    /// Single-connection in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let database = Self { pool };
        database.initialize_tables().await?;
        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let statements = [
            (
                "job_configs",
                r#"
                CREATE TABLE IF NOT EXISTS job_configs (
                    name TEXT PRIMARY KEY,
                    config TEXT NOT NULL DEFAULT '{}',
                    created_at DATETIME NOT NULL,
                    updated_at DATETIME NOT NULL
                )
                "#,
            ),
            (
                "job_registry",
                r#"
                CREATE TABLE IF NOT EXISTS job_registry (
                    name TEXT PRIMARY KEY,
                    enabled BOOLEAN NOT NULL DEFAULT 0
                )
                "#,
            ),
            (
                "backup_runs",
                r#"
                CREATE TABLE IF NOT EXISTS backup_runs (
                    id TEXT PRIMARY KEY,
                    job_name TEXT NOT NULL,
                    status TEXT NOT NULL,
                    archive_name TEXT,
                    remote_path TEXT,
                    remote_deleted BOOLEAN NOT NULL DEFAULT 0,
                    started_at DATETIME NOT NULL,
                    completed_at DATETIME,
                    error_message TEXT
                )
                "#,
            ),
            (
                "idx_backup_runs_job",
                "CREATE INDEX IF NOT EXISTS idx_backup_runs_job ON backup_runs(job_name, started_at DESC)",
            ),
        ];

        for (name, sql) in statements {
            if let Err(e) = sqlx::query(sql).execute(&self.pool).await {
                error!("Failed to create {}: {}", name, e);
                return Err(e.into());
            }
            debug!("{} ready", name);
        }

        Ok(())
    }
}
