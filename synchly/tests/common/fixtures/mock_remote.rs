//! In-memory remote endpoint
//!
//! Tracks every session opened and closed so tests can check that each
//! transfer operation uses exactly one session and always releases it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use synchly::config::RemoteSyncConfig;
use synchly::remote::{RemoteConnector, RemoteEntry, RemoteSession};

#[derive(Default)]
struct RemoteState {
    entries: Mutex<HashMap<String, RemoteEntry>>,
    uploads: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    connect_attempts: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    refuse_connections: AtomicBool,
    fail_uploads: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<RemoteState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote with `path` existing as a directory
    pub fn with_directory(path: &str) -> Self {
        let connector = Self::new();
        connector.set_entry(path, RemoteEntry::Directory);
        connector
    }

    pub fn set_entry(&self, path: &str, entry: RemoteEntry) {
        self.state
            .entries
            .lock()
            .unwrap()
            .insert(path.to_string(), entry);
    }

    pub fn entry(&self, path: &str) -> RemoteEntry {
        self.state
            .entries
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(RemoteEntry::Missing)
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<String> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.state.deletes.lock().unwrap().clone()
    }

    /// Files currently stored on the remote
    pub fn remote_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .state
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, entry)| **entry == RemoteEntry::File)
            .map(|(path, _)| path.clone())
            .collect();
        files.sort();
        files
    }
}

#[async_trait]
impl RemoteConnector for MockConnector {
    async fn connect(&self, config: &RemoteSyncConfig) -> Result<Box<dyn RemoteSession>> {
        self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.refuse_connections.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused by {}", config.host));
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    state: Arc<RemoteState>,
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn stat(&mut self, remote_path: &str) -> Result<RemoteEntry> {
        Ok(self
            .state
            .entries
            .lock()
            .unwrap()
            .get(remote_path)
            .copied()
            .unwrap_or(RemoteEntry::Missing))
    }

    async fn put(&mut self, local_path: &Path, remote_path: &str) -> Result<()> {
        if self.state.fail_uploads.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset during transfer"));
        }
        tokio::fs::metadata(local_path)
            .await
            .map_err(|e| anyhow!("cannot read {}: {}", local_path.display(), e))?;

        self.state
            .entries
            .lock()
            .unwrap()
            .insert(remote_path.to_string(), RemoteEntry::File);
        self.state.uploads.lock().unwrap().push(remote_path.to_string());
        Ok(())
    }

    async fn remove(&mut self, remote_path: &str) -> Result<()> {
        let mut entries = self.state.entries.lock().unwrap();
        match entries.get(remote_path) {
            Some(RemoteEntry::File) => {
                entries.remove(remote_path);
                self.state.deletes.lock().unwrap().push(remote_path.to_string());
                Ok(())
            }
            Some(RemoteEntry::Directory) => Err(anyhow!("{} is a directory", remote_path)),
            _ => Err(anyhow!("No such file: {}", remote_path)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
