//! Database dump dispatch
//!
//! The dispatcher routes a job's `db` configuration to the adapter for its
//! `db_type` and wraps adapter failures uniformly. Dump mechanics belong to
//! the adapters, which drive the vendor dump tools.

mod command;
pub mod mongodb;
pub mod mysql;

pub use mongodb::MongoDbAdapter;
pub use mysql::MySqlAdapter;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::constants::jobs::ARCHIVE_TIMESTAMP_FORMAT;
use crate::errors::DumpError;

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    MongoDb,
    MySql,
}

impl DbType {
    pub const ALL: [DbType; 2] = [DbType::MongoDb, DbType::MySql];

    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::MongoDb => "MongoDB",
            DbType::MySql => "MySQL",
        }
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(DbType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|db_type| db_type.as_str() == s)
            .ok_or_else(|| DumpError::UnsupportedAdapter {
                db_type: s.to_string(),
                supported: Self::supported_list(),
            })
    }
}

/// A database engine able to check connectivity and write a dump archive
#[async_trait]
pub trait DumpAdapter: Send + Sync {
    async fn connect(&self, config: &DbConfig) -> Result<()>;

    /// Write a dump of `config.database` into `destination_dir`, returning the archive path
    async fn dump(&self, config: &DbConfig, destination_dir: &Path) -> Result<PathBuf>;
}

pub struct DumpDispatcher {
    mongodb: Arc<dyn DumpAdapter>,
    mysql: Arc<dyn DumpAdapter>,
}

impl DumpDispatcher {
    /// Dispatcher backed by the vendor command line tools
    pub fn new() -> Self {
        Self::with_adapters(Arc::new(MongoDbAdapter::new()), Arc::new(MySqlAdapter::new()))
    }

    pub fn with_adapters(mongodb: Arc<dyn DumpAdapter>, mysql: Arc<dyn DumpAdapter>) -> Self {
        Self { mongodb, mysql }
    }

    fn adapter_for(&self, db_type: DbType) -> &Arc<dyn DumpAdapter> {
        match db_type {
            DbType::MongoDb => &self.mongodb,
            DbType::MySql => &self.mysql,
        }
    }

    /// Produce a dump archive for a job. Unknown `db_type` never reaches an adapter.
    pub async fn produce_dump(
        &self,
        config: &DbConfig,
        destination_dir: &Path,
    ) -> Result<PathBuf, DumpError> {
        let db_type: DbType = config.db_type.parse()?;
        info!(
            "Dumping {} database '{}' from {}:{}",
            db_type, config.database, config.host, config.port
        );

        let archive = self
            .adapter_for(db_type)
            .dump(config, destination_dir)
            .await
            .map_err(|source| DumpError::AdapterFailure {
                adapter: db_type,
                source,
            })?;

        debug!("{} dump written to {}", db_type, archive.display());
        Ok(archive)
    }

    pub async fn test_connection(&self, config: &DbConfig) -> Result<(), DumpError> {
        let db_type: DbType = config.db_type.parse()?;
        self.adapter_for(db_type)
            .connect(config)
            .await
            .map_err(|source| DumpError::AdapterFailure {
                adapter: db_type,
                source,
            })
    }
}

impl Default for DumpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn safe_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// `<database>_<YYYY-MM-DD_HH-MM-SS>.<extension>`, with unsafe characters replaced
pub fn archive_file_name(database: &str, extension: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        safe_file_component(database),
        at.format(ARCHIVE_TIMESTAMP_FORMAT),
        extension
    )
}

/// `<job>_<archive file name>`: the name an artifact carries locally and on the remote
pub fn job_archive_name(job_name: &str, archive_file_name: &str) -> String {
    format!("{}_{}", safe_file_component(job_name), archive_file_name)
}
