use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use super::command::run_tool;
use super::{archive_file_name, DumpAdapter};
use crate::config::DbConfig;
use crate::constants::timeouts;

/// MongoDB through `mongodump` (gzipped archive) and `mongosh` (ping)
pub struct MongoDbAdapter {
    dump_program: String,
    shell_program: String,
}

impl MongoDbAdapter {
    pub fn new() -> Self {
        Self {
            dump_program: "mongodump".to_string(),
            shell_program: "mongosh".to_string(),
        }
    }

    fn connection_args(config: &DbConfig) -> Vec<String> {
        let mut args = vec![
            "--host".to_string(),
            config.host.clone(),
            "--port".to_string(),
            config.port.to_string(),
        ];
        if let Some(username) = &config.username {
            args.push("--username".to_string());
            args.push(username.clone());
            if let Some(password) = &config.password {
                args.push("--password".to_string());
                args.push(password.clone());
            }
            args.push("--authenticationDatabase".to_string());
            args.push(
                config
                    .auth_database
                    .clone()
                    .unwrap_or_else(|| "admin".to_string()),
            );
        }
        args
    }
}

impl Default for MongoDbAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DumpAdapter for MongoDbAdapter {
    async fn connect(&self, config: &DbConfig) -> Result<()> {
        let mut args = Self::connection_args(config);
        args.extend([
            "--quiet".to_string(),
            "--eval".to_string(),
            "db.runCommand({ ping: 1 }).ok".to_string(),
            config.database.clone(),
        ]);

        let output = run_tool(
            &self.shell_program,
            &args,
            &[],
            Some(timeouts::DB_CONNECT_CHECK),
        )
        .await?;

        if output.trim() == "1" {
            Ok(())
        } else {
            Err(anyhow!(
                "MongoDB at {}:{} did not answer ping: {}",
                config.host,
                config.port,
                output.trim()
            ))
        }
    }

    async fn dump(&self, config: &DbConfig, destination_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(destination_dir).await?;
        let archive = destination_dir.join(archive_file_name(&config.database, "gz", Utc::now()));

        let mut args = Self::connection_args(config);
        args.extend([
            "--db".to_string(),
            config.database.clone(),
            format!("--archive={}", archive.display()),
            "--gzip".to_string(),
        ]);

        run_tool(&self.dump_program, &args, &[], None).await?;
        info!("mongodump finished: {}", archive.display());
        Ok(archive)
    }
}
