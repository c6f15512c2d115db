//! Scripted pipeline and recording notifier for scheduler tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use synchly::errors::{BackupError, ConfigError};
use synchly::pipeline::{JobPipeline, PipelineOutcome};
use synchly::services::{EventKind, Notifier, PipelineEvent};

#[derive(Default)]
pub struct ScriptedPipeline {
    delay: Duration,
    job_delays: HashMap<String, Duration>,
    failing_jobs: HashSet<String>,
    panicking_jobs: HashSet<String>,
    runs: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay for one job only, overriding `with_delay`
    pub fn with_job_delay(mut self, job_name: &str, delay: Duration) -> Self {
        self.job_delays.insert(job_name.to_string(), delay);
        self
    }

    pub fn failing_for(mut self, job_name: &str) -> Self {
        self.failing_jobs.insert(job_name.to_string());
        self
    }

    pub fn panicking_for(mut self, job_name: &str) -> Self {
        self.panicking_jobs.insert(job_name.to_string());
        self
    }

    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }

    pub fn runs_of(&self, job_name: &str) -> usize {
        self.runs().iter().filter(|name| *name == job_name).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobPipeline for ScriptedPipeline {
    async fn run(&self, job_name: &str, run_id: &str) -> Result<PipelineOutcome, BackupError> {
        self.runs.lock().unwrap().push(job_name.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.job_delays.get(job_name).copied().unwrap_or(self.delay);
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking_jobs.contains(job_name) {
            panic!("dump tool crashed for {}", job_name);
        }
        if self.failing_jobs.contains(job_name) {
            return Err(ConfigError::MissingModule {
                job_name: job_name.to_string(),
                module: "db".to_string(),
            }
            .into());
        }

        Ok(PipelineOutcome {
            run_id: run_id.to_string(),
            job_name: job_name.to_string(),
            archive_name: format!("{}_archive.gz", job_name),
            remote_path: Some(format!("/srv/backups/{}_archive.gz", job_name)),
            local_path: None,
            pruned_remote_files: 0,
            pruned_local_files: 0,
            duration_seconds: 0,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds_for(&self, job_name: &str) -> Vec<EventKind> {
        self.events()
            .into_iter()
            .filter(|event| event.job_name == job_name)
            .map(|event| event.kind)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
