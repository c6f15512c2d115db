//! Backup run history.

use anyhow::{anyhow, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error};

use super::records::{BackupRunRecord, RunStatus};
use super::Database;

const RUN_COLUMNS: &str = "id, job_name, status, archive_name, remote_path, remote_deleted, \
                           started_at, completed_at, error_message";

impl Database {
    pub async fn store_backup_run(&self, run: &BackupRunRecord) -> Result<()> {
        debug!("Storing backup run {} ({})", run.id, run.status.as_str());

        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO backup_runs (
                id, job_name, status, archive_name, remote_path, remote_deleted,
                started_at, completed_at, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.id)
        .bind(&run.job_name)
        .bind(run.status.as_str())
        .bind(&run.archive_name)
        .bind(&run.remote_path)
        .bind(run.remote_deleted)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(&run.error_message)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            error!("Failed to store backup run {}: {}", run.id, e);
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn get_backup_run(&self, id: &str) -> Result<Option<BackupRunRecord>> {
        let sql = format!("SELECT {} FROM backup_runs WHERE id = ?", RUN_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| run_from_row(&row)).transpose()
    }

    pub async fn get_recent_runs(&self, job_name: &str, limit: i64) -> Result<Vec<BackupRunRecord>> {
        let sql = format!(
            "SELECT {} FROM backup_runs WHERE job_name = ? ORDER BY started_at DESC LIMIT ?",
            RUN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(job_name)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(run_from_row).collect()
    }

    /// Completed uploads still present on the remote, newest first, skipping the newest `keep`
    pub async fn get_expired_uploads(&self, job_name: &str, keep: u32) -> Result<Vec<BackupRunRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM backup_runs
            WHERE job_name = ? AND status = 'completed'
              AND remote_path IS NOT NULL AND remote_deleted = 0
            ORDER BY started_at DESC
            LIMIT -1 OFFSET ?
            "#,
            RUN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(job_name)
            .bind(keep as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(run_from_row).collect()
    }

    pub async fn mark_remote_deleted(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE backup_runs SET remote_deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn run_from_row(row: &SqliteRow) -> Result<BackupRunRecord> {
    let status: String = row.try_get("status")?;
    Ok(BackupRunRecord {
        id: row.try_get("id")?,
        job_name: row.try_get("job_name")?,
        status: RunStatus::parse(&status).ok_or_else(|| anyhow!("Unknown run status '{}'", status))?,
        archive_name: row.try_get("archive_name")?,
        remote_path: row.try_get("remote_path")?,
        remote_deleted: row.try_get("remote_deleted")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        error_message: row.try_get("error_message")?,
    })
}
