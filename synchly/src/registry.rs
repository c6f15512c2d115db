//! Job registry: durable job name -> {enabled, schedule, module configs} mapping.
//!
//! The registry is the only way other components read or change job state;
//! it is handed to the scheduler, the pipeline and the notifier explicitly.
//! Every mutation is persisted before the call returns.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::{BackupTime, DbConfig, ModuleKind, NotifyConfig, RemoteSyncConfig};
use crate::database::{Database, JobConfigRecord};
use crate::errors::{BackupError, ConfigError};

/// A job as stored in the registry, with its modules decoded
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub name: String,
    pub enabled: bool,
    pub db: Option<DbConfig>,
    pub remote_sync: Option<RemoteSyncConfig>,
    pub remote_sync_enabled: bool,
    pub notify: Option<NotifyConfig>,
    pub notify_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    fn from_record(record: JobConfigRecord) -> Result<Self, ConfigError> {
        let document: Value =
            serde_json::from_str(&record.config).map_err(|e| ConfigError::InvalidModule {
                job_name: record.name.clone(),
                module: "document".to_string(),
                reason: e.to_string(),
            })?;

        let flag = |key: &str| document.get(key).and_then(Value::as_bool).unwrap_or(false);

        Ok(Self {
            db: decode_module(&record.name, &document, ModuleKind::Db)?,
            remote_sync: decode_module(&record.name, &document, ModuleKind::RemoteSync)?,
            notify: decode_module(&record.name, &document, ModuleKind::Notify)?,
            remote_sync_enabled: flag("remote_sync_enabled"),
            notify_enabled: flag("notify_enabled"),
            name: record.name,
            enabled: record.enabled,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Daily backup time, taken from the db module
    pub fn schedule(&self) -> Option<BackupTime> {
        self.db.as_ref().map(|db| db.backup_time)
    }

    pub fn require_db(&self) -> Result<&DbConfig, ConfigError> {
        self.db.as_ref().ok_or_else(|| self.missing(ModuleKind::Db))
    }

    pub fn require_remote_sync(&self) -> Result<&RemoteSyncConfig, ConfigError> {
        self.remote_sync
            .as_ref()
            .ok_or_else(|| self.missing(ModuleKind::RemoteSync))
    }

    pub fn is_module_configured(&self, module: ModuleKind) -> bool {
        match module {
            ModuleKind::Db => self.db.is_some(),
            ModuleKind::RemoteSync => self.remote_sync.is_some(),
            ModuleKind::Notify => self.notify.is_some(),
        }
    }

    fn missing(&self, module: ModuleKind) -> ConfigError {
        ConfigError::MissingModule {
            job_name: self.name.clone(),
            module: module.as_str().to_string(),
        }
    }
}

fn decode_module<T: DeserializeOwned>(
    job_name: &str,
    document: &Value,
    module: ModuleKind,
) -> Result<Option<T>, ConfigError> {
    match document.get(module.document_key()) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ConfigError::InvalidModule {
                job_name: job_name.to_string(),
                module: module.as_str().to_string(),
                reason: e.to_string(),
            }),
    }
}

pub struct JobRegistry {
    db: Arc<Database>,
}

impl JobRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Names of all jobs currently marked enabled
    pub async fn list_enabled_jobs(&self) -> Result<Vec<String>, BackupError> {
        self.db
            .get_enabled_job_names()
            .await
            .map_err(BackupError::Storage)
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, BackupError> {
        let records = self
            .db
            .get_all_job_records()
            .await
            .map_err(BackupError::Storage)?;

        records
            .into_iter()
            .map(|record| Job::from_record(record).map_err(BackupError::from))
            .collect()
    }

    pub async fn get_job(&self, name: &str) -> Result<Job, BackupError> {
        let record = self
            .db
            .get_job_record(name)
            .await
            .map_err(BackupError::Storage)?
            .ok_or_else(|| ConfigError::JobNotFound {
                job_name: name.to_string(),
            })?;

        Ok(Job::from_record(record)?)
    }

    /// Mark a job enabled or disabled. Takes effect for triggers on the next scheduler start.
    #[instrument(skip(self))]
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), BackupError> {
        self.ensure_exists(name).await?;
        self.db
            .set_job_enabled(name, enabled)
            .await
            .map_err(BackupError::Storage)?;
        info!("Job '{}' {}", name, if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Merge a module's configuration into the job document, creating the job if needed.
    ///
    /// The value is stored as given; semantic validation happens before this call.
    #[instrument(skip(self, config), fields(module = %module))]
    pub async fn upsert_module_config(
        &self,
        name: &str,
        module: ModuleKind,
        config: &Value,
    ) -> Result<(), BackupError> {
        self.db
            .set_job_field(name, module.document_key(), &config.to_string())
            .await
            .map_err(BackupError::Storage)?;
        info!("Stored {} configuration for job '{}'", module, name);
        Ok(())
    }

    /// Switch an optional module on or off. Enabling requires the module to be configured.
    pub async fn set_module_enabled(
        &self,
        name: &str,
        module: ModuleKind,
        enabled: bool,
    ) -> Result<(), BackupError> {
        let flag_key = module.enabled_flag_key().ok_or_else(|| ConfigError::InvalidValue {
            field: "module".to_string(),
            reason: format!("'{}' cannot be enabled or disabled", module),
        })?;

        let job = self.get_job(name).await?;
        if enabled && !job.is_module_configured(module) {
            return Err(ConfigError::MissingModule {
                job_name: name.to_string(),
                module: module.as_str().to_string(),
            }
            .into());
        }

        self.db
            .set_job_field(name, flag_key, if enabled { "true" } else { "false" })
            .await
            .map_err(BackupError::Storage)?;
        info!(
            "{} {} for job '{}'",
            module,
            if enabled { "enabled" } else { "disabled" },
            name
        );
        Ok(())
    }

    /// Remove the job's configuration and registry entry
    pub async fn reset_job(&self, name: &str) -> Result<(), BackupError> {
        let deleted = self.db.delete_job(name).await.map_err(BackupError::Storage)?;
        if !deleted {
            return Err(ConfigError::JobNotFound {
                job_name: name.to_string(),
            }
            .into());
        }
        info!("Configuration of job '{}' reset", name);
        Ok(())
    }

    async fn ensure_exists(&self, name: &str) -> Result<(), BackupError> {
        let exists = self.db.job_exists(name).await.map_err(BackupError::Storage)?;
        if exists {
            Ok(())
        } else {
            Err(ConfigError::JobNotFound {
                job_name: name.to_string(),
            }
            .into())
        }
    }
}
