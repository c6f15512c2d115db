use anyhow::{anyhow, Result};
use chrono::TimeZone;
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::Trigger;
use crate::errors::BackupError;
use crate::pipeline::JobPipeline;
use crate::registry::JobRegistry;
use crate::run_tracker::JobRunTracker;
use crate::services::{Notifier, PipelineEvent};

/// Result of a single trigger firing
#[derive(Debug)]
pub enum FireOutcome {
    /// The pipeline was spawned; the handle resolves once the job is idle again
    Started(JoinHandle<()>),
    /// The previous run was still in flight
    Skipped,
}

/// Runs one firing of a job: overlap check, pipeline, state reset, notification
#[derive(Clone)]
struct TriggerRunner {
    pipeline: Arc<dyn JobPipeline>,
    notifier: Arc<dyn Notifier>,
    tracker: JobRunTracker,
}

impl TriggerRunner {
    async fn fire(&self, job_name: &str) -> FireOutcome {
        let run_id = Uuid::new_v4().to_string();

        if let Err(overlap) = self.tracker.try_start(job_name, &run_id).await {
            warn!("⏭ {}", overlap);
            self.notifier
                .notify(&PipelineEvent::missed_trigger(job_name, &overlap))
                .await;
            return FireOutcome::Skipped;
        }

        info!("💾 Executing scheduled backup for {} (run {})", job_name, run_id);
        let runner = self.clone();
        let job_name = job_name.to_string();
        FireOutcome::Started(tokio::spawn(async move {
            runner.run_to_completion(job_name, run_id).await;
        }))
    }

    async fn run_to_completion(&self, job_name: String, run_id: String) {
        let pipeline = self.pipeline.clone();
        let (name, id) = (job_name.clone(), run_id.clone());

        // The inner task turns a panic into a JoinError, so the job always returns to Idle
        let result = match tokio::spawn(async move { pipeline.run(&name, &id).await }).await {
            Ok(result) => result,
            Err(join_error) => Err(BackupError::Panicked {
                job_name: job_name.clone(),
                reason: join_error.to_string(),
            }),
        };

        self.tracker.finish(&job_name).await;

        let event = match &result {
            Ok(outcome) => {
                info!(
                    "✓ Scheduled backup completed for {}: {} ({}s)",
                    job_name, outcome.archive_name, outcome.duration_seconds
                );
                PipelineEvent::succeeded(outcome)
            }
            Err(e) => {
                error!("✗ Scheduled backup failed for {}: {}", job_name, e);
                PipelineEvent::failed(&job_name, e)
            }
        };
        self.notifier.notify(&event).await;
    }
}

pub struct BackupScheduler {
    registry: Arc<JobRegistry>,
    runner: TriggerRunner,
    timezone: Option<Tz>,
    scheduler: JobScheduler,
    triggers: RwLock<Vec<Trigger>>,
}

impl BackupScheduler {
    pub async fn new(
        registry: Arc<JobRegistry>,
        pipeline: Arc<dyn JobPipeline>,
        notifier: Arc<dyn Notifier>,
        tracker: JobRunTracker,
        timezone: Option<Tz>,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create JobScheduler: {}", e))?;

        Ok(Self {
            registry,
            runner: TriggerRunner {
                pipeline,
                notifier,
                tracker,
            },
            timezone,
            scheduler,
            triggers: RwLock::new(Vec::new()),
        })
    }

    /// Compute one daily trigger per enabled job from its stored backup time.
    ///
    /// A job that cannot be scheduled is logged and skipped; it never blocks the others.
    pub async fn plan_triggers(&self) -> Result<Vec<Trigger>, BackupError> {
        let mut triggers = Vec::new();

        for job_name in self.registry.list_enabled_jobs().await? {
            match self.registry.get_job(&job_name).await {
                Ok(job) => match job.schedule() {
                    Some(time) => triggers.push(Trigger::daily(&job_name, time)),
                    None => warn!("Job {} is enabled but has no db configuration, skipping", job_name),
                },
                Err(e) => error!("✗ Cannot schedule job {}: {}", job_name, e),
            }
        }

        Ok(triggers)
    }

    /// Register all triggers and start the cron loop. Returns the number of scheduled jobs.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<usize> {
        info!(
            "Starting backup scheduler ({})",
            self.timezone
                .map(|tz| tz.name().to_string())
                .unwrap_or_else(|| "local time".to_string())
        );

        let mut registered = Vec::new();
        for trigger in self.plan_triggers().await? {
            match self.register(&trigger).await {
                Ok(()) => {
                    info!("✓ Scheduled job {} daily at {}", trigger.job_name, trigger.time);
                    registered.push(trigger);
                }
                Err(e) => {
                    error!(
                        "✗ Failed to schedule job {}: {} (cron: {})",
                        trigger.job_name, e, trigger.cron_expression
                    );
                }
            }
        }

        if registered.is_empty() {
            warn!("No enabled jobs with a backup time - scheduler not started");
        } else {
            self.scheduler
                .start()
                .await
                .map_err(|e| anyhow!("Failed to start JobScheduler: {}", e))?;
            info!("✓ Backup scheduler started with {} jobs", registered.len());
        }

        let count = registered.len();
        *self.triggers.write().await = registered;
        Ok(count)
    }

    async fn register(&self, trigger: &Trigger) -> Result<()> {
        let job = match self.timezone {
            Some(tz) => cron_job(trigger, tz, self.runner.clone()),
            None => cron_job(trigger, chrono::Local, self.runner.clone()),
        }
        .map_err(|e| anyhow!("Failed to create job for '{}': {}", trigger.cron_expression, e))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add job to scheduler: {}", e))?;
        Ok(())
    }

    /// Fire a job's trigger now, exactly as the cron loop would
    pub async fn fire(&self, job_name: &str) -> FireOutcome {
        self.runner.fire(job_name).await
    }

    /// Triggers registered by the last `start`
    pub async fn registered_triggers(&self) -> Vec<Trigger> {
        self.triggers.read().await.clone()
    }

    pub fn tracker(&self) -> &JobRunTracker {
        &self.runner.tracker
    }

    /// Stop firing triggers. Runs already in flight are abandoned with the process.
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("Failed to stop JobScheduler: {}", e))
    }
}

fn cron_job<TZ>(trigger: &Trigger, timezone: TZ, runner: TriggerRunner) -> Result<Job, JobSchedulerError>
where
    TZ: TimeZone + Send + Sync + 'static,
    TZ::Offset: Send + Sync,
{
    let job_name = trigger.job_name.clone();

    Job::new_async_tz(trigger.cron_expression.as_str(), timezone, move |_uuid, _scheduler| {
        let runner = runner.clone();
        let job_name = job_name.clone();

        Box::pin(async move {
            // fire() returns as soon as the run is spawned
            runner.fire(&job_name).await;
        })
    })
}
