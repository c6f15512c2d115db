//! Integration tests for command line handling against a temporary job database

mod common;

use clap::Parser;
use common::fixtures::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use synchly::cli::{self, Cli};
use synchly::database::Database;
use synchly::errors::{BackupError, ConfigError};
use synchly::registry::JobRegistry;

struct Workspace {
    dir: TempDir,
    settings: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join("synchly.toml");
        std::fs::write(
            &settings,
            format!(
                "database_path = \"{}\"\nbackup_dir = \"{}\"\n",
                dir.path().join("synchly.db").display(),
                dir.path().join("backups").display()
            ),
        )
        .unwrap();
        Self { dir, settings }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    async fn run(&self, args: &[&str]) -> Result<(), BackupError> {
        let settings = self.settings.display().to_string();
        let mut argv = vec!["synchly", "--settings", settings.as_str()];
        argv.extend_from_slice(args);
        cli::run(Cli::try_parse_from(argv).unwrap()).await
    }

    async fn registry(&self) -> JobRegistry {
        let path = self.dir.path().join("synchly.db");
        let database = Database::new(&path.display().to_string()).await.unwrap();
        JobRegistry::new(Arc::new(database))
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[tokio::test]
async fn test_file_without_config_is_rejected() {
    let workspace = Workspace::new();

    let error = workspace.run(&["--file", "db.json"]).await.unwrap_err();

    assert!(matches!(error, BackupError::Config(ConfigError::InvalidValue { .. })));
    assert_eq!(error.exit_code(), 2);
}

#[tokio::test]
async fn test_config_without_file_is_rejected() {
    let workspace = Workspace::new();

    let error = workspace.run(&["--config", "notify"]).await.unwrap_err();

    assert!(matches!(error, BackupError::Config(ConfigError::InvalidValue { .. })));
}

#[tokio::test]
async fn test_notify_module_from_file_then_enable() {
    let workspace = Workspace::new();
    let file = workspace.write("notify.json", r#"{ "webhook_url": "https://hooks.example.test/backup" }"#);

    workspace
        .run(&["-j", "nightly", "-c", "notify", "-f", &path_arg(&file)])
        .await
        .unwrap();
    workspace.run(&["-j", "nightly", "--enable", "notify"]).await.unwrap();

    let job = workspace.registry().await.get_job("nightly").await.unwrap();
    assert!(job.notify_enabled);
    assert_eq!(
        job.notify.unwrap().webhook_url,
        "https://hooks.example.test/backup"
    );
    assert!(!job.enabled);
}

#[tokio::test]
async fn test_toml_module_file_is_accepted() {
    let workspace = Workspace::new();
    let file = workspace.write("notify.toml", "webhook_url = \"https://hooks.example.test/t\"\n");

    workspace
        .run(&["--config", "smtp", "--file", &path_arg(&file)])
        .await
        .unwrap();

    let job = workspace.registry().await.get_job(jobs::MASTER).await.unwrap();
    assert_eq!(job.notify.unwrap().webhook_url, "https://hooks.example.test/t");
}

#[tokio::test]
async fn test_invalid_module_file_is_not_stored() {
    let workspace = Workspace::new();
    let file = workspace.write("notify.json", r#"{ "webhook_url": "not a url" }"#);

    let error = workspace
        .run(&["-c", "notify", "-f", &path_arg(&file)])
        .await
        .unwrap_err();

    assert!(matches!(error, BackupError::Config(ConfigError::InvalidValue { .. })));
    assert!(workspace.registry().await.get_job(jobs::MASTER).await.is_err());
}

#[tokio::test]
async fn test_missing_module_file_fails_to_load() {
    let workspace = Workspace::new();

    let error = workspace
        .run(&["-c", "db", "-f", "/nonexistent/db.json"])
        .await
        .unwrap_err();

    assert!(matches!(error, BackupError::Config(ConfigError::LoadFailed { .. })));
}

#[tokio::test]
async fn test_enable_unconfigured_module_fails() {
    let workspace = Workspace::new();
    let file = workspace.write("notify.json", r#"{ "webhook_url": "https://hooks.example.test/b" }"#);
    workspace
        .run(&["-c", "notify", "-f", &path_arg(&file)])
        .await
        .unwrap();

    let error = workspace.run(&["--enable", "remote-sync"]).await.unwrap_err();

    assert!(matches!(error, BackupError::Config(ConfigError::MissingModule { .. })));
}

#[tokio::test]
async fn test_enablejob_requires_db_module() {
    let workspace = Workspace::new();
    let file = workspace.write("notify.json", r#"{ "webhook_url": "https://hooks.example.test/b" }"#);
    workspace
        .run(&["-c", "notify", "-f", &path_arg(&file)])
        .await
        .unwrap();

    let error = workspace.run(&["--enablejob", jobs::MASTER]).await.unwrap_err();
    assert!(matches!(error, BackupError::Config(ConfigError::MissingModule { .. })));

    let error = workspace.run(&["--enablejob", "ghost"]).await.unwrap_err();
    assert!(matches!(error, BackupError::Config(ConfigError::JobNotFound { .. })));
}

#[tokio::test]
async fn test_enablejob_and_disablejob_with_db_module() {
    let workspace = Workspace::new();
    let registry = workspace.registry().await;
    registry
        .upsert_module_config(
            jobs::MASTER,
            synchly::ModuleKind::Db,
            &db_module("MongoDB", "02:30"),
        )
        .await
        .unwrap();

    workspace.run(&["--enablejob", jobs::MASTER]).await.unwrap();
    assert!(registry.get_job(jobs::MASTER).await.unwrap().enabled);
    assert_eq!(registry.list_enabled_jobs().await.unwrap(), vec![jobs::MASTER.to_string()]);

    workspace.run(&["--disablejob", jobs::MASTER]).await.unwrap();
    assert!(!registry.get_job(jobs::MASTER).await.unwrap().enabled);
    workspace.run(&["--disablejob", jobs::MASTER]).await.unwrap();
}

#[tokio::test]
async fn test_reset_requires_confirmation() {
    let workspace = Workspace::new();
    let file = workspace.write("notify.json", r#"{ "webhook_url": "https://hooks.example.test/b" }"#);
    workspace
        .run(&["-c", "notify", "-f", &path_arg(&file)])
        .await
        .unwrap();

    workspace.run(&["--reset"]).await.unwrap();
    assert!(workspace.registry().await.get_job(jobs::MASTER).await.is_ok());

    workspace.run(&["--reset", "--yes"]).await.unwrap();
    assert!(workspace.registry().await.get_job(jobs::MASTER).await.is_err());

    let error = workspace.run(&["--reset", "--yes"]).await.unwrap_err();
    assert!(matches!(error, BackupError::Config(ConfigError::JobNotFound { .. })));
}

#[tokio::test]
async fn test_list_with_jobs() {
    let workspace = Workspace::new();
    let file = workspace.write("notify.json", r#"{ "webhook_url": "https://hooks.example.test/b" }"#);
    workspace
        .run(&["-c", "notify", "-f", &path_arg(&file)])
        .await
        .unwrap();

    workspace.run(&["--list"]).await.unwrap();
}
