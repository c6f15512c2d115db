use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use super::command::run_tool;
use super::{archive_file_name, DumpAdapter};
use crate::config::DbConfig;
use crate::constants::timeouts;

/// MySQL through `mysqldump` and `mysqladmin ping`; the password travels in `MYSQL_PWD`
pub struct MySqlAdapter {
    dump_program: String,
    admin_program: String,
}

impl MySqlAdapter {
    pub fn new() -> Self {
        Self {
            dump_program: "mysqldump".to_string(),
            admin_program: "mysqladmin".to_string(),
        }
    }

    fn connection_args(config: &DbConfig) -> Vec<String> {
        let mut args = vec![
            format!("--host={}", config.host),
            format!("--port={}", config.port),
        ];
        if let Some(username) = &config.username {
            args.push(format!("--user={}", username));
        }
        args
    }

    fn password_env(config: &DbConfig) -> Vec<(&'static str, String)> {
        config
            .password
            .as_ref()
            .map(|password| vec![("MYSQL_PWD", password.clone())])
            .unwrap_or_default()
    }
}

impl Default for MySqlAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DumpAdapter for MySqlAdapter {
    async fn connect(&self, config: &DbConfig) -> Result<()> {
        let mut args = Self::connection_args(config);
        args.push("ping".to_string());

        run_tool(
            &self.admin_program,
            &args,
            &Self::password_env(config),
            Some(timeouts::DB_CONNECT_CHECK),
        )
        .await?;
        Ok(())
    }

    async fn dump(&self, config: &DbConfig, destination_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(destination_dir).await?;
        let archive = destination_dir.join(archive_file_name(&config.database, "sql", Utc::now()));

        let mut args = Self::connection_args(config);
        args.extend([
            "--single-transaction".to_string(),
            "--routines".to_string(),
            format!("--result-file={}", archive.display()),
            config.database.clone(),
        ]);

        run_tool(&self.dump_program, &args, &Self::password_env(config), None).await?;
        info!("mysqldump finished: {}", archive.display());
        Ok(archive)
    }
}
