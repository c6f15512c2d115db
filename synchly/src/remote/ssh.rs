use anyhow::{anyhow, Result};
use async_ssh2_tokio::client::{AuthMethod, Client, ServerCheckMethod};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{RemoteConnector, RemoteEntry, RemoteSession};
use crate::config::RemoteSyncConfig;

/// Password-authenticated SSH sessions; uploads go over SFTP
pub struct SshConnector {
    connect_timeout: Duration,
}

impl SshConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl RemoteConnector for SshConnector {
    async fn connect(&self, config: &RemoteSyncConfig) -> Result<Box<dyn RemoteSession>> {
        debug!("Establishing SSH session to {}@{}:{}", config.auth_user, config.host, config.port);

        let auth_method = AuthMethod::with_password(&config.auth_password);
        let client = tokio::time::timeout(
            self.connect_timeout,
            Client::connect(
                (config.host.as_str(), config.port),
                &config.auth_user,
                auth_method,
                ServerCheckMethod::NoCheck,
            ),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "SSH connection timed out after {}s",
                self.connect_timeout.as_secs()
            )
        })?
        .map_err(|e| {
            anyhow!(
                "Failed to connect to SSH server {}@{}: {}",
                config.auth_user,
                config.host,
                e
            )
        })?;

        Ok(Box::new(SshSession {
            client,
            host: config.host.clone(),
        }))
    }
}

struct SshSession {
    client: Client,
    host: String,
}

impl SshSession {
    async fn run(&self, command: &str) -> Result<String> {
        debug!("Executing on {}: {}", self.host, command);

        let result = self
            .client
            .execute(command)
            .await
            .map_err(|e| anyhow!("SSH command execution failed on {}: {}", self.host, e))?;

        if result.exit_status != 0 {
            let stderr = result.stderr.trim();
            return Err(anyhow!(
                "Command failed on {} with exit code {}: {}",
                self.host,
                result.exit_status,
                if stderr.is_empty() { "Unknown error" } else { stderr }
            ));
        }

        Ok(result.stdout.trim().to_string())
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn stat(&mut self, remote_path: &str) -> Result<RemoteEntry> {
        let path = shell_quote(remote_path);
        let output = self
            .run(&format!(
                "if [ -d {p} ]; then echo d; elif [ -e {p} ]; then echo f; else echo missing; fi",
                p = path
            ))
            .await?;

        parse_stat_output(&output)
    }

    async fn put(&mut self, local_path: &Path, remote_path: &str) -> Result<()> {
        self.client
            .upload_file(local_path, remote_path)
            .await
            .map_err(|e| anyhow!("SFTP upload to {}:{} failed: {}", self.host, remote_path, e))
    }

    async fn remove(&mut self, remote_path: &str) -> Result<()> {
        self.run(&format!("rm -- {}", shell_quote(remote_path)))
            .await
            .map(|_| ())
    }

    async fn close(&mut self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| anyhow!("Failed to disconnect from {}: {}", self.host, e))
    }
}

fn parse_stat_output(output: &str) -> Result<RemoteEntry> {
    match output.trim() {
        "d" => Ok(RemoteEntry::Directory),
        "f" => Ok(RemoteEntry::File),
        "missing" => Ok(RemoteEntry::Missing),
        other => Err(anyhow!("Unexpected stat output: '{}'", other)),
    }
}

/// POSIX single-quote a value for the remote shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
