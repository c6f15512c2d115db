//! Command line surface: job selection, module configuration from files,
//! enable/disable switches, reset, and the long-running scheduler.

use clap::{CommandFactory, Parser};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{AppConfig, ConfigManager, DbConfig, ModuleKind, NotifyConfig, RemoteSyncConfig};
use crate::constants::{jobs, strings};
use crate::database::Database;
use crate::dump::DumpDispatcher;
use crate::errors::{BackupError, ConfigError};
use crate::pipeline::BackupPipeline;
use crate::registry::JobRegistry;
use crate::remote::{RemoteTransferClient, SshConnector};
use crate::run_tracker::JobRunTracker;
use crate::scheduler::BackupScheduler;
use crate::services::NotificationService;

/// synchly - scheduled database backups shipped to remote storage
#[derive(Parser, Debug, Clone)]
#[command(name = "synchly", version, about, long_about = None)]
pub struct Cli {
    /// Job to operate on
    #[arg(short = 'j', long = "job", default_value = jobs::DEFAULT_JOB_NAME)]
    pub job: String,

    /// Configure a module of the job from --file
    #[arg(short = 'c', long = "config", value_enum)]
    pub config: Option<ModuleKind>,

    /// JSON or TOML file holding the module configuration
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Enable an optional module of the job (remote-sync, notify)
    #[arg(short = 'e', long = "enable", value_enum)]
    pub enable: Option<ModuleKind>,

    /// Disable an optional module of the job (remote-sync, notify)
    #[arg(short = 'd', long = "disable", value_enum)]
    pub disable: Option<ModuleKind>,

    /// Enable scheduled backups for a job
    #[arg(long = "enablejob", value_name = "JOB")]
    pub enable_job: Option<String>,

    /// Disable scheduled backups for a job
    #[arg(long = "disablejob", value_name = "JOB")]
    pub disable_job: Option<String>,

    /// List all jobs and their modules
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Start the scheduler for all enabled jobs
    #[arg(short = 's', long = "start")]
    pub start: bool,

    /// Remove the job's whole configuration
    #[arg(short = 'r', long = "reset")]
    pub reset: bool,

    /// Confirm --reset
    #[arg(long = "yes", requires = "reset")]
    pub yes: bool,

    /// Print full error details
    #[arg(short = 'D', long = "debug", alias = "stacktrace", short_alias = 'S')]
    pub debug: bool,

    /// Settings file (default: config/synchly.toml or $SYNCHLY_CONFIG)
    #[arg(long = "settings", value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.config.is_some()
            || self.file.is_some()
            || self.enable.is_some()
            || self.disable.is_some()
            || self.enable_job.is_some()
            || self.disable_job.is_some()
            || self.list
            || self.start
            || self.reset
    }
}

struct Context {
    settings: Arc<AppConfig>,
    registry: Arc<JobRegistry>,
}

impl Context {
    async fn open(settings_path: Option<&Path>) -> Result<Self, BackupError> {
        let manager = ConfigManager::load(settings_path).await?;
        let settings = manager.get_current_config();
        let database = Database::new(&settings.database_path)
            .await
            .map_err(BackupError::Storage)?;

        Ok(Self {
            settings,
            registry: Arc::new(JobRegistry::new(Arc::new(database))),
        })
    }

    fn transfer_client(&self) -> Arc<RemoteTransferClient> {
        let connector = SshConnector::new(Duration::from_secs(
            self.settings.remote_connect_timeout_seconds,
        ));
        Arc::new(RemoteTransferClient::new(Arc::new(connector)))
    }
}

/// Execute the actions requested on the command line
pub async fn run(cli: Cli) -> Result<(), BackupError> {
    if !cli.has_action() {
        // Printing help to stdout only fails when stdout is gone
        let _ = Cli::command().print_help();
        return Ok(());
    }

    if cli.file.is_some() && cli.config.is_none() {
        return Err(ConfigError::InvalidValue {
            field: "--file".to_string(),
            reason: strings::FILE_WITHOUT_CONFIG.to_string(),
        }
        .into());
    }

    let context = Context::open(cli.settings.as_deref()).await?;
    let job_name = cli.job.as_str();

    if cli.reset {
        if !cli.yes {
            println!("{}", strings::RESET_CONFIRM_HINT);
            return Ok(());
        }
        context.registry.reset_job(job_name).await?;
        println!("Configuration of job '{}' has been reset", job_name);
        return Ok(());
    }

    if let Some(module) = cli.config {
        let file = cli.file.as_deref().ok_or_else(|| ConfigError::InvalidValue {
            field: "--file".to_string(),
            reason: strings::INTERACTIVE_UNSUPPORTED.to_string(),
        })?;
        configure_module(&context, job_name, module, file).await?;
        println!("{} configuration of job '{}' updated successfully", module, job_name);
    }

    if let Some(module) = cli.enable {
        context.registry.set_module_enabled(job_name, module, true).await?;
        println!("{} enabled", module);
    }

    if let Some(module) = cli.disable {
        context.registry.set_module_enabled(job_name, module, false).await?;
        println!("{} disabled", module);
    }

    if let Some(name) = cli.enable_job.as_deref() {
        let job = context.registry.get_job(name).await?;
        job.require_db()?;
        if job.enabled {
            println!("Job '{}' already enabled", name);
        } else {
            context.registry.set_enabled(name, true).await?;
            println!("Enabled job '{}'", name);
        }
    }

    if let Some(name) = cli.disable_job.as_deref() {
        let job = context.registry.get_job(name).await?;
        if !job.enabled {
            println!("Job '{}' already disabled", name);
        } else {
            context.registry.set_enabled(name, false).await?;
            println!("Disabled job '{}'", name);
        }
    }

    if cli.list {
        list_jobs(&context).await?;
    }

    if cli.start {
        start_scheduler(&context).await?;
    }

    Ok(())
}

/// Validate a module file and store it. Db and remote-sync settings are checked live.
async fn configure_module(
    context: &Context,
    job_name: &str,
    module: ModuleKind,
    file: &Path,
) -> Result<(), BackupError> {
    let value = read_module_file(file).await?;
    let invalid = |e: serde_json::Error| ConfigError::InvalidValue {
        field: module.as_str().to_string(),
        reason: e.to_string(),
    };

    match module {
        ModuleKind::Db => {
            let db: DbConfig = serde_json::from_value(value.clone()).map_err(invalid)?;
            println!("Authenticating, please wait...");
            DumpDispatcher::new().test_connection(&db).await?;
            println!("Authentication success");
        }
        ModuleKind::RemoteSync => {
            let remote: RemoteSyncConfig = serde_json::from_value(value.clone()).map_err(invalid)?;
            println!("Verifying {}:{}, please wait...", remote.host, remote.remote_base_path);
            context
                .transfer_client()
                .verify_remote_directory(&remote)
                .await?;
            println!("Remote directory verified");
        }
        ModuleKind::Notify => {
            let notify: NotifyConfig = serde_json::from_value(value.clone()).map_err(invalid)?;
            reqwest::Url::parse(&notify.webhook_url).map_err(|e| ConfigError::InvalidValue {
                field: "webhook_url".to_string(),
                reason: e.to_string(),
            })?;
        }
    }

    context
        .registry
        .upsert_module_config(job_name, module, &value)
        .await
}

/// Module files are JSON, or TOML when the extension says so
async fn read_module_file(path: &Path) -> Result<Value, BackupError> {
    let load_failed = |reason: String| ConfigError::LoadFailed {
        path: path.display().to_string(),
        reason,
    };

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| load_failed(e.to_string()))?;
    if !metadata.is_file() {
        return Err(load_failed("is a directory".to_string()).into());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| load_failed(e.to_string()))?;

    let value = if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
        toml::from_str::<Value>(&content).map_err(|e| load_failed(e.to_string()))?
    } else {
        serde_json::from_str::<Value>(&content).map_err(|e| load_failed(e.to_string()))?
    };
    Ok(value)
}

async fn list_jobs(context: &Context) -> Result<(), BackupError> {
    let jobs = context.registry.list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs configured");
        return Ok(());
    }

    for job in jobs {
        let schedule = job
            .schedule()
            .map(|time| time.to_string())
            .unwrap_or_else(|| "--:--".to_string());
        println!(
            "{:<20} {:<9} daily at {}  remote-sync: {}  notify: {}",
            job.name,
            if job.enabled { "enabled" } else { "disabled" },
            schedule,
            module_state(job.remote_sync.is_some(), job.remote_sync_enabled),
            module_state(job.notify.is_some(), job.notify_enabled),
        );
    }
    Ok(())
}

fn module_state(configured: bool, enabled: bool) -> &'static str {
    match (configured, enabled) {
        (false, _) => "not configured",
        (true, true) => "on",
        (true, false) => "off",
    }
}

async fn start_scheduler(context: &Context) -> Result<(), BackupError> {
    let notifier = NotificationService::new(
        context.registry.clone(),
        Duration::from_secs(context.settings.notify_timeout_seconds),
    )
    .map_err(BackupError::Storage)?;

    let pipeline = BackupPipeline::new(
        context.registry.clone(),
        Arc::new(DumpDispatcher::new()),
        context.transfer_client(),
        context.settings.backup_dir.clone(),
    );

    let scheduler = BackupScheduler::new(
        context.registry.clone(),
        Arc::new(pipeline),
        Arc::new(notifier),
        JobRunTracker::new(),
        context.settings.schedule_timezone()?,
    )
    .await
    .map_err(BackupError::Storage)?;

    let scheduled = scheduler.start().await.map_err(BackupError::Storage)?;
    for trigger in scheduler.registered_triggers().await {
        println!("Started job {} (daily at {})", trigger.job_name, trigger.time);
    }
    if scheduled == 0 {
        println!("No enabled jobs to schedule, enable one with --enablejob <name>");
        return Ok(());
    }

    println!("{}", strings::STARTED);
    println!("{}", strings::RESTART_NOTICE);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping scheduler");
    scheduler.shutdown().await.map_err(BackupError::Storage)?;
    Ok(())
}
