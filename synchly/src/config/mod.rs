pub mod manager;

use crate::constants::{paths, timeouts};
use crate::errors::ConfigError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use manager::ConfigManager;

/// Process-wide settings loaded from `config/synchly.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    /// IANA timezone for job schedules; local time when absent
    pub timezone: Option<String>,
    #[serde(default = "default_remote_connect_timeout")]
    pub remote_connect_timeout_seconds: u64,
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_seconds: u64,
}

fn default_database_path() -> String {
    paths::DEFAULT_DATABASE_PATH.to_string()
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_BACKUP_DIR)
}

fn default_remote_connect_timeout() -> u64 {
    timeouts::REMOTE_CONNECT_SECONDS
}

fn default_notify_timeout() -> u64 {
    timeouts::NOTIFY_SECONDS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            backup_dir: default_backup_dir(),
            timezone: None,
            remote_connect_timeout_seconds: default_remote_connect_timeout(),
            notify_timeout_seconds: default_notify_timeout(),
        }
    }
}

impl AppConfig {
    /// Parsed schedule timezone, `None` meaning the host's local time
    pub fn schedule_timezone(&self) -> Result<Option<Tz>, ConfigError> {
        match &self.timezone {
            None => Ok(None),
            Some(name) => name
                .parse::<Tz>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    field: "timezone".to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}

/// The configurable parts of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ModuleKind {
    #[value(name = "db")]
    Db,
    #[value(name = "remote-sync")]
    RemoteSync,
    #[value(name = "notify", alias = "smtp")]
    Notify,
}

impl ModuleKind {
    /// Name shown to users and accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Db => "db",
            ModuleKind::RemoteSync => "remote-sync",
            ModuleKind::Notify => "notify",
        }
    }

    /// Key of the module inside the stored job document
    pub fn document_key(&self) -> &'static str {
        match self {
            ModuleKind::Db => "db",
            ModuleKind::RemoteSync => "remote_sync",
            ModuleKind::Notify => "notify",
        }
    }

    /// Key of the module's on/off flag, `None` for modules that cannot be toggled
    pub fn enabled_flag_key(&self) -> Option<&'static str> {
        match self {
            ModuleKind::Db => None,
            ModuleKind::RemoteSync => Some("remote_sync_enabled"),
            ModuleKind::Notify => Some("notify_enabled"),
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily wall-clock backup time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupTime {
    pub hour: u32,
    pub minute: u32,
}

impl BackupTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        if hour > 23 || minute > 59 {
            return Err(ConfigError::InvalidValue {
                field: "backup_time".to_string(),
                reason: format!("{:02}:{:02} is not a valid time of day", hour, minute),
            });
        }
        Ok(Self { hour, minute })
    }
}

impl FromStr for BackupTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            field: "backup_time".to_string(),
            reason: format!("expected HH:MM, got '{}'", s),
        };

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse::<u32>().map_err(|_| invalid())?;
        let minute = minute.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for BackupTime {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackupTime> for String {
    fn from(value: BackupTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BackupTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// `db` module of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Adapter tag, e.g. "MongoDB" or "MySQL"
    pub db_type: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    /// Authentication database (MongoDB only)
    pub auth_database: Option<String>,
    pub backup_time: BackupTime,
    /// Number of most recent dumps kept in the job's local backup directory; unlimited when absent
    pub retention_count: Option<u32>,
}

/// `remote-sync` module of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSyncConfig {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub auth_user: String,
    pub auth_password: String,
    pub remote_base_path: String,
    /// Number of most recent uploads kept on the remote; unlimited when absent
    pub retention_count: Option<u32>,
}

fn default_ssh_port() -> u16 {
    22
}

/// `notify` module of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub webhook_url: String,
}
