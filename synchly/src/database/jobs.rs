//! Job document and registry operations.
//!
//! Every mutation is a single statement so a write to one job record is
//! atomic without cross-job transactions.

use anyhow::Result;
use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use super::records::JobConfigRecord;
use super::Database;

impl Database {
    pub async fn get_job_record(&self, name: &str) -> Result<Option<JobConfigRecord>> {
        let row = sqlx::query(
            r#"
            SELECT c.name, c.config, c.created_at, c.updated_at,
                   COALESCE(r.enabled, 0) AS enabled
            FROM job_configs c
            LEFT JOIN job_registry r ON r.name = c.name
            WHERE c.name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(JobConfigRecord {
                name: row.try_get("name")?,
                config: row.try_get("config")?,
                enabled: row.try_get("enabled")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }

    pub async fn job_exists(&self, name: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM job_configs WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Set one top-level key of a job document, creating the job when absent.
    ///
    /// `value_json` must be JSON text; it is stored as a nested value, not a string.
    pub async fn set_job_field(&self, name: &str, key: &str, value_json: &str) -> Result<()> {
        debug!("Setting '{}' of job {}", key, name);

        let now = Utc::now();
        let json_path = format!("$.{}", key);

        sqlx::query(
            r#"
            INSERT INTO job_configs (name, config, created_at, updated_at)
            VALUES (?, json_object(?, json(?)), ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                config = json_set(job_configs.config, ?, json(?)),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(key)
        .bind(value_json)
        .bind(now)
        .bind(now)
        .bind(&json_path)
        .bind(value_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_job_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_registry (name, enabled) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET enabled = excluded.enabled
            "#,
        )
        .bind(name)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_enabled_job_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT r.name FROM job_registry r
            JOIN job_configs c ON c.name = r.name
            WHERE r.enabled = 1
            ORDER BY r.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    pub async fn get_all_job_records(&self) -> Result<Vec<JobConfigRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name, c.config, c.created_at, c.updated_at,
                   COALESCE(r.enabled, 0) AS enabled
            FROM job_configs c
            LEFT JOIN job_registry r ON r.name = c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(JobConfigRecord {
                name: row.try_get("name")?,
                config: row.try_get("config")?,
                enabled: row.try_get("enabled")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            });
        }
        Ok(records)
    }

    /// Remove a job's document and registry entry. Run history is kept.
    pub async fn delete_job(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM job_configs WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM job_registry WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted > 0)
    }
}
