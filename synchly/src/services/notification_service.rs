use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::BackupError;
use crate::pipeline::PipelineOutcome;
use crate::registry::JobRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Succeeded,
    Failed,
    MissedTrigger,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    pub timestamp: DateTime<Utc>,
    pub job_name: String,
    pub kind: EventKind,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl PipelineEvent {
    pub fn succeeded(outcome: &PipelineOutcome) -> Self {
        let message = match &outcome.remote_path {
            Some(remote_path) => format!("Backup {} uploaded to {}", outcome.archive_name, remote_path),
            None => format!("Backup {} stored locally", outcome.archive_name),
        };
        Self {
            timestamp: Utc::now(),
            job_name: outcome.job_name.clone(),
            kind: EventKind::Succeeded,
            message,
            details: serde_json::to_value(outcome).ok(),
        }
    }

    pub fn failed(job_name: &str, error: &BackupError) -> Self {
        Self {
            timestamp: Utc::now(),
            job_name: job_name.to_string(),
            kind: EventKind::Failed,
            message: error.to_string(),
            details: Some(serde_json::json!({ "error_kind": error.kind() })),
        }
    }

    pub fn missed_trigger(job_name: &str, error: &BackupError) -> Self {
        Self {
            timestamp: Utc::now(),
            job_name: job_name.to_string(),
            kind: EventKind::MissedTrigger,
            message: error.to_string(),
            details: Some(serde_json::json!({ "error_kind": error.kind() })),
        }
    }
}

/// Receives pipeline outcomes. Delivery problems are the notifier's own concern
/// and never reach the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PipelineEvent);
}

/// Posts events as JSON to the job's webhook when its notify module is enabled
pub struct NotificationService {
    registry: Arc<JobRegistry>,
    client: Client,
    request_timeout: Duration,
}

impl NotificationService {
    pub fn new(registry: Arc<JobRegistry>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client for notifications: {}", e))?;

        Ok(Self {
            registry,
            client,
            request_timeout,
        })
    }

    async fn send_webhook(&self, webhook_url: &str, event: &PipelineEvent) {
        match timeout(
            self.request_timeout,
            self.client.post(webhook_url).json(event).send(),
        )
        .await
        {
            Ok(Ok(response)) => {
                if response.status().is_success() {
                    info!("Notification sent for {}: {:?}", event.job_name, event.kind);
                } else {
                    warn!(
                        "Notification webhook returned status: {} for {}",
                        response.status(),
                        event.job_name
                    );
                }
            }
            Ok(Err(e)) => {
                warn!("Failed to send notification for {}: {}", event.job_name, e);
            }
            Err(_) => {
                warn!("Notification webhook timeout for {}", event.job_name);
            }
        }
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, event: &PipelineEvent) {
        let job = match self.registry.get_job(&event.job_name).await {
            Ok(job) => job,
            Err(e) => {
                warn!("Cannot load notify settings of job {}: {}", event.job_name, e);
                return;
            }
        };

        match (&job.notify, job.notify_enabled) {
            (Some(notify), true) => self.send_webhook(&notify.webhook_url, event).await,
            _ => debug!("Notifications disabled for job {}, skipping", event.job_name),
        }
    }
}
