//! Per-job run state for the scheduler
//!
//! A job is either `Idle` or `Running`. Only one pipeline run per job may be
//! in flight: starting a run on a `Running` job fails with an overlap error
//! and leaves the existing run untouched. Finishing always returns the job
//! to `Idle`, whatever the outcome of the run was.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::errors::BackupError;

#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub job_name: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobState {
    Idle,
    Running { run_id: String, since: DateTime<Utc> },
}

#[derive(Clone, Default)]
pub struct JobRunTracker {
    active_runs: Arc<RwLock<HashMap<String, ActiveRun>>>, // job_name -> run
}

impl JobRunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a job to `Running`, or report an overlap if it already is
    #[instrument(skip(self), fields(job = %job_name))]
    pub async fn try_start(&self, job_name: &str, run_id: &str) -> Result<(), BackupError> {
        let mut active = self.active_runs.write().await;

        if let Some(current) = active.get(job_name) {
            return Err(BackupError::SchedulerOverlap {
                job_name: job_name.to_string(),
                running_for: format_elapsed(current.started_at),
            });
        }

        active.insert(
            job_name.to_string(),
            ActiveRun {
                job_name: job_name.to_string(),
                run_id: run_id.to_string(),
                started_at: Utc::now(),
            },
        );
        info!("Job '{}' is running (run {})", job_name, run_id);
        Ok(())
    }

    /// Return a job to `Idle`
    #[instrument(skip(self), fields(job = %job_name))]
    pub async fn finish(&self, job_name: &str) {
        let mut active = self.active_runs.write().await;
        if let Some(run) = active.remove(job_name) {
            info!(
                "Job '{}' is idle again (run {} took {})",
                job_name,
                run.run_id,
                format_elapsed(run.started_at)
            );
        }
    }

    pub async fn state(&self, job_name: &str) -> JobState {
        let active = self.active_runs.read().await;
        match active.get(job_name) {
            Some(run) => JobState::Running {
                run_id: run.run_id.clone(),
                since: run.started_at,
            },
            None => JobState::Idle,
        }
    }

    pub async fn is_running(&self, job_name: &str) -> bool {
        self.active_runs.read().await.contains_key(job_name)
    }

    pub async fn active_runs(&self) -> Vec<ActiveRun> {
        self.active_runs.read().await.values().cloned().collect()
    }
}

fn format_elapsed(since: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(since);
    if duration.num_hours() > 0 {
        format!("{}h {}m", duration.num_hours(), duration.num_minutes() % 60)
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        format!("{}s", duration.num_seconds())
    }
}
