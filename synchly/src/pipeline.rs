//! Dump → transfer pipeline executed once per trigger firing
//!
//! The pipeline owns the dump artifact it creates and names it
//! `<job>_<archive>`, locally and on the remote. After a successful upload
//! the local file is deleted; when remote sync is disabled or the upload
//! fails the file stays in the backup directory, as it is then the only copy.
//! The db module's `retention_count` bounds that directory, the remote-sync
//! module's `retention_count` bounds the remote.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{error, info, warn};

use crate::config::RemoteSyncConfig;
use crate::database::{BackupRunRecord, RunStatus};
use crate::dump::{job_archive_name, safe_file_component, DumpDispatcher};
use crate::errors::BackupError;
use crate::registry::{Job, JobRegistry};
use crate::remote::RemoteTransferClient;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub job_name: String,
    pub archive_name: String,
    /// Set when the artifact was shipped to the remote endpoint
    pub remote_path: Option<String>,
    /// Set when the artifact was kept on local disk
    pub local_path: Option<PathBuf>,
    pub pruned_remote_files: u32,
    pub pruned_local_files: u32,
    pub duration_seconds: u64,
}

/// One complete backup of a job
#[async_trait]
pub trait JobPipeline: Send + Sync {
    async fn run(&self, job_name: &str, run_id: &str) -> Result<PipelineOutcome, BackupError>;
}

pub struct BackupPipeline {
    registry: Arc<JobRegistry>,
    dispatcher: Arc<DumpDispatcher>,
    transfer: Arc<RemoteTransferClient>,
    backup_dir: PathBuf,
}

impl BackupPipeline {
    pub fn new(
        registry: Arc<JobRegistry>,
        dispatcher: Arc<DumpDispatcher>,
        transfer: Arc<RemoteTransferClient>,
        backup_dir: PathBuf,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            transfer,
            backup_dir,
        }
    }

    /// Local directory holding a job's artifacts
    pub fn job_dir(&self, job_name: &str) -> PathBuf {
        self.backup_dir.join(safe_file_component(job_name))
    }

    async fn execute(&self, job: &Job, run: &mut BackupRunRecord) -> Result<PipelineOutcome, BackupError> {
        let started = Instant::now();
        let db_config = job.require_db()?;
        let destination = self.job_dir(&job.name);

        let dumped = self.dispatcher.produce_dump(db_config, &destination).await?;
        let (archive, archive_name) = label_with_job(&job.name, &dumped).await?;
        run.archive_name = Some(archive_name.clone());

        let mut outcome = PipelineOutcome {
            run_id: run.id.clone(),
            job_name: job.name.clone(),
            archive_name: archive_name.clone(),
            remote_path: None,
            local_path: None,
            pruned_remote_files: 0,
            pruned_local_files: 0,
            duration_seconds: 0,
        };

        if job.remote_sync_enabled {
            let remote = job.require_remote_sync()?;

            let remote_path = match self.transfer.upload(remote, &archive_name, &archive).await {
                Ok(path) => path,
                Err(e) => {
                    warn!(
                        "Upload of {} failed, local copy kept at {}",
                        archive_name,
                        archive.display()
                    );
                    prune_local(&destination, db_config.retention_count).await;
                    return Err(e.into());
                }
            };

            // Upload succeeded; a failed history write is logged only
            run.remote_path = Some(remote_path.clone());
            run.status = RunStatus::Completed;
            run.completed_at = Some(Utc::now());
            if let Err(e) = self.registry.database().store_backup_run(run).await {
                error!("Failed to record upload of {} for run {}: {}", archive_name, run.id, e);
            }

            release_artifact(&archive).await;
            outcome.remote_path = Some(remote_path);
            outcome.pruned_remote_files = self.prune_remote(&job.name, remote).await;
        } else {
            info!(
                "Remote sync disabled for job '{}', backup kept at {}",
                job.name,
                archive.display()
            );
            outcome.local_path = Some(archive);
        }

        outcome.pruned_local_files = prune_local(&destination, db_config.retention_count).await;
        outcome.duration_seconds = started.elapsed().as_secs();
        Ok(outcome)
    }

    /// Delete uploads beyond the job's retention count. Failures are logged only.
    async fn prune_remote(&self, job_name: &str, remote: &RemoteSyncConfig) -> u32 {
        let keep = match remote.retention_count {
            Some(keep) if keep > 0 => keep,
            _ => return 0,
        };

        let database = self.registry.database();
        let expired = match database.get_expired_uploads(job_name, keep).await {
            Ok(expired) => expired,
            Err(e) => {
                warn!("Could not load upload history of job {}: {}", job_name, e);
                return 0;
            }
        };

        let mut pruned = 0;
        for run in expired {
            let Some(archive_name) = run.archive_name.as_deref() else {
                continue;
            };
            match self.transfer.delete(remote, archive_name).await {
                Ok(()) => {
                    pruned += 1;
                    if let Err(e) = database.mark_remote_deleted(&run.id).await {
                        warn!("Failed to record deletion of {}: {}", archive_name, e);
                    }
                }
                Err(e) => warn!("Retention cleanup of {} failed: {}", archive_name, e),
            }
        }

        if pruned > 0 {
            info!(
                "Removed {} old backups of job {} from the remote (keeping {})",
                pruned, job_name, keep
            );
        }
        pruned
    }
}

#[async_trait]
impl JobPipeline for BackupPipeline {
    async fn run(&self, job_name: &str, run_id: &str) -> Result<PipelineOutcome, BackupError> {
        let job = self.registry.get_job(job_name).await?;
        let database = self.registry.database();

        let mut run = BackupRunRecord {
            id: run_id.to_string(),
            job_name: job_name.to_string(),
            status: RunStatus::Started,
            archive_name: None,
            remote_path: None,
            remote_deleted: false,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        database
            .store_backup_run(&run)
            .await
            .map_err(BackupError::Storage)?;

        let result = self.execute(&job, &mut run).await;

        run.completed_at = Some(Utc::now());
        match &result {
            Ok(_) => run.status = RunStatus::Completed,
            Err(e) => {
                run.status = RunStatus::Failed;
                run.error_message = Some(e.to_string());
            }
        }
        if let Err(e) = database.store_backup_run(&run).await {
            error!("Failed to record outcome of run {}: {}", run.id, e);
        }

        result
    }
}

/// Rename a fresh dump to `<job>_<file>` in place
async fn label_with_job(job_name: &str, dumped: &Path) -> Result<(PathBuf, String), BackupError> {
    let file_name = dumped
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            BackupError::Storage(anyhow::anyhow!(
                "Dump produced an unusable path: {}",
                dumped.display()
            ))
        })?;

    let archive_name = job_archive_name(job_name, file_name);
    let archive = dumped.with_file_name(&archive_name);
    tokio::fs::rename(dumped, &archive).await?;
    Ok((archive, archive_name))
}

async fn release_artifact(archive: &Path) {
    match tokio::fs::remove_file(archive).await {
        Ok(()) => info!("Released local artifact {}", archive.display()),
        Err(e) => warn!("Failed to remove local artifact {}: {}", archive.display(), e),
    }
}

/// Keep the newest `retention_count` files of a job directory. Failures are logged only.
async fn prune_local(job_dir: &Path, retention_count: Option<u32>) -> u32 {
    let keep = match retention_count {
        Some(keep) if keep > 0 => keep as usize,
        _ => return 0,
    };

    let mut artifacts = match list_artifacts(job_dir).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            warn!("Could not list local backups in {}: {}", job_dir.display(), e);
            return 0;
        }
    };

    if artifacts.len() <= keep {
        return 0;
    }

    // Newest first; names carry the dump timestamp and break ties
    artifacts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

    let mut pruned = 0;
    for (path, _) in &artifacts[keep..] {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!("Deleted old local backup {}", path.display());
                pruned += 1;
            }
            Err(e) => warn!("Failed to delete old local backup {}: {}", path.display(), e),
        }
    }

    info!(
        "Removed {} old local backups from {} (keeping {})",
        pruned,
        job_dir.display(),
        keep
    );
    pruned
}

async fn list_artifacts(job_dir: &Path) -> std::io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut artifacts = Vec::new();
    let mut entries = tokio::fs::read_dir(job_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            artifacts.push((entry.path(), metadata.modified()?));
        }
    }
    Ok(artifacts)
}
