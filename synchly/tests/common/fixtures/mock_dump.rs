//! Dump adapters that write small files instead of calling vendor tools

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use synchly::config::DbConfig;
use synchly::dump::{DumpAdapter, DumpDispatcher};

#[derive(Default)]
pub struct MockDumpAdapter {
    extension: String,
    dumps: AtomicUsize,
    connects: AtomicUsize,
    fail: AtomicBool,
    fixed_name: Mutex<Option<String>>,
}

impl MockDumpAdapter {
    pub fn new(extension: &str) -> Arc<Self> {
        Arc::new(Self {
            extension: extension.to_string(),
            ..Self::default()
        })
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Write every dump under this exact file name, like a real adapter firing in the same second
    pub fn set_fixed_name(&self, file_name: Option<&str>) {
        *self.fixed_name.lock().unwrap() = file_name.map(str::to_string);
    }

    pub fn dump_calls(&self) -> usize {
        self.dumps.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Dispatcher wired to a MongoDB and a MySQL mock
    pub fn dispatcher() -> (Arc<DumpDispatcher>, Arc<Self>, Arc<Self>) {
        let mongodb = Self::new("gz");
        let mysql = Self::new("sql");
        let dispatcher = DumpDispatcher::with_adapters(mongodb.clone(), mysql.clone());
        (Arc::new(dispatcher), mongodb, mysql)
    }
}

#[async_trait]
impl DumpAdapter for MockDumpAdapter {
    async fn connect(&self, config: &DbConfig) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("authentication failed for {}", config.host));
        }
        Ok(())
    }

    async fn dump(&self, config: &DbConfig, destination_dir: &Path) -> Result<PathBuf> {
        let sequence = self.dumps.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("dump tool exited with status 1"));
        }

        tokio::fs::create_dir_all(destination_dir).await?;
        let file_name = self
            .fixed_name
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| format!("{}_{:03}.{}", config.database, sequence, self.extension));
        let archive = destination_dir.join(file_name);
        tokio::fs::write(&archive, b"dump contents").await?;
        Ok(archive)
    }
}
