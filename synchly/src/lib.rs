pub mod cli;
pub mod config;
pub mod constants;
pub mod database;
pub mod dump;
pub mod errors;
pub mod pipeline;
pub mod registry;
pub mod remote;
pub mod run_tracker;
pub mod scheduler;
pub mod services;

// Re-export commonly used types
pub use config::{AppConfig, BackupTime, ConfigManager, DbConfig, ModuleKind, NotifyConfig, RemoteSyncConfig};
pub use database::Database;
pub use dump::{DbType, DumpAdapter, DumpDispatcher};
pub use errors::{BackupError, ConfigError, DumpError, RemoteError};
pub use pipeline::{BackupPipeline, JobPipeline, PipelineOutcome};
pub use registry::{Job, JobRegistry};
pub use remote::{RemoteConnector, RemoteEntry, RemoteSession, RemoteTransferClient, SshConnector};
pub use run_tracker::{JobRunTracker, JobState};
pub use scheduler::{BackupScheduler, FireOutcome, Trigger};
pub use services::{NotificationService, Notifier, PipelineEvent};
