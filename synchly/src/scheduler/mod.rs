//! Cron-based scheduling of backup jobs
//!
//! Every enabled job gets one daily trigger at its stored backup time:
//!
//! - **6-field cron**: triggers are registered as `0 <minute> <hour> * * *`
//!   (sec min hour day month dow) with `tokio-cron-scheduler`
//! - **Timezone-aware**: local time of the host, or the `timezone` setting
//! - **Snapshot at start**: triggers are computed once when the scheduler
//!   starts; changing a backup time or enabling a job needs a restart
//! - **Overlap skip**: a trigger that fires while the job's previous run is
//!   still in flight is skipped and reported as a missed trigger
//! - **Fault isolation**: a failing or panicking run is reported and the job
//!   goes back to waiting for its next trigger; other jobs are unaffected
//!
//! ```toml
//! # db module of a job (stored in the registry)
//! db_type = "MongoDB"
//! backup_time = "02:30"   # daily at 02:30
//! ```

pub mod operations;
pub use operations::{BackupScheduler, FireOutcome};

use serde::Serialize;

use crate::config::BackupTime;

/// A job's computed recurring fire time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub job_name: String,
    pub time: BackupTime,
    pub cron_expression: String,
}

impl Trigger {
    pub fn daily(job_name: &str, time: BackupTime) -> Self {
        Self {
            job_name: job_name.to_string(),
            time,
            cron_expression: format!("0 {} {} * * *", time.minute, time.hour),
        }
    }
}
