//! Remote transfer client
//!
//! Every operation opens its own session, performs exactly one action and
//! closes the session before returning, on success and on failure. Sessions
//! are never pooled or shared between calls or jobs.

pub mod ssh;

pub use ssh::SshConnector;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::RemoteSyncConfig;
use crate::errors::RemoteError;

/// What a remote path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntry {
    Missing,
    File,
    Directory,
}

/// One open connection to the remote storage endpoint
#[async_trait]
pub trait RemoteSession: Send {
    async fn stat(&mut self, remote_path: &str) -> Result<RemoteEntry>;

    async fn put(&mut self, local_path: &Path, remote_path: &str) -> Result<()>;

    /// Remove a file; removing a path that does not exist is an error
    async fn remove(&mut self, remote_path: &str) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions against a remote endpoint
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, config: &RemoteSyncConfig) -> Result<Box<dyn RemoteSession>>;
}

/// Join the remote base path and a file name with a single separator
pub fn remote_join(base_path: &str, file_name: &str) -> String {
    format!(
        "{}/{}",
        base_path.trim_end_matches('/'),
        file_name.trim_start_matches('/')
    )
}

pub struct RemoteTransferClient {
    connector: Arc<dyn RemoteConnector>,
}

impl RemoteTransferClient {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self { connector }
    }

    /// Check that the configured base path exists and is a directory
    #[instrument(skip(self, config), fields(host = %config.host, path = %config.remote_base_path))]
    pub async fn verify_remote_directory(&self, config: &RemoteSyncConfig) -> Result<(), RemoteError> {
        let mut session = self.open(config).await?;
        let result = session.stat(&config.remote_base_path).await;
        Self::close(session.as_mut(), config).await;

        match result {
            Ok(RemoteEntry::Directory) => {
                debug!("Remote directory {} verified", config.remote_base_path);
                Ok(())
            }
            Ok(RemoteEntry::File) => Err(RemoteError::NotADirectory {
                path: config.remote_base_path.clone(),
            }),
            Ok(RemoteEntry::Missing) => Err(RemoteError::PathMissing {
                path: config.remote_base_path.clone(),
            }),
            Err(e) => Err(RemoteError::ConnectionFailed {
                host: config.host.clone(),
                reason: format!("could not inspect {}: {}", config.remote_base_path, e),
            }),
        }
    }

    /// Upload a local file under the base path, returning the remote path.
    /// The local file is never touched.
    #[instrument(skip(self, config, local_file_path), fields(host = %config.host))]
    pub async fn upload(
        &self,
        config: &RemoteSyncConfig,
        local_file_name: &str,
        local_file_path: &Path,
    ) -> Result<String, RemoteError> {
        let remote_path = remote_join(&config.remote_base_path, local_file_name);

        let mut session = self.open(config).await?;
        let result = session.put(local_file_path, &remote_path).await;
        Self::close(session.as_mut(), config).await;

        match result {
            Ok(()) => {
                info!("Uploaded {} to {}:{}", local_file_path.display(), config.host, remote_path);
                Ok(remote_path)
            }
            Err(source) => Err(RemoteError::TransferFailed {
                local_path: local_file_path.display().to_string(),
                remote_path,
                source,
            }),
        }
    }

    /// Delete a file under the base path
    #[instrument(skip(self, config), fields(host = %config.host))]
    pub async fn delete(&self, config: &RemoteSyncConfig, remote_file_name: &str) -> Result<(), RemoteError> {
        let remote_path = remote_join(&config.remote_base_path, remote_file_name);

        let mut session = self.open(config).await?;
        let result = session.remove(&remote_path).await;
        Self::close(session.as_mut(), config).await;

        match result {
            Ok(()) => {
                info!("Deleted {}:{}", config.host, remote_path);
                Ok(())
            }
            Err(source) => Err(RemoteError::DeleteFailed { remote_path, source }),
        }
    }

    async fn open(&self, config: &RemoteSyncConfig) -> Result<Box<dyn RemoteSession>, RemoteError> {
        debug!("Opening remote session to {}:{}", config.host, config.port);
        self.connector
            .connect(config)
            .await
            .map_err(|e| RemoteError::ConnectionFailed {
                host: format!("{}:{}", config.host, config.port),
                reason: e.to_string(),
            })
    }

    /// A failed close never masks the outcome of the operation itself
    async fn close(session: &mut dyn RemoteSession, config: &RemoteSyncConfig) {
        if let Err(e) = session.close().await {
            warn!("Failed to close remote session to {}: {}", config.host, e);
        }
    }
}
