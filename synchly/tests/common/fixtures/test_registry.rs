//! In-memory registry builder

use std::sync::Arc;

use synchly::config::ModuleKind;
use synchly::database::Database;
use synchly::registry::JobRegistry;

use super::test_data::{db_module, notify_module, remote_module};

pub struct TestRegistry {
    pub registry: Arc<JobRegistry>,
}

impl TestRegistry {
    pub async fn new() -> Self {
        let database = Database::in_memory()
            .await
            .expect("in-memory database should open");
        Self {
            registry: Arc::new(JobRegistry::new(Arc::new(database))),
        }
    }

    pub fn database(&self) -> Arc<Database> {
        self.registry.database()
    }

    /// Job with a db module, enabled or not
    pub async fn add_job(&self, name: &str, db_type: &str, backup_time: &str, enabled: bool) -> &Self {
        self.registry
            .upsert_module_config(name, ModuleKind::Db, &db_module(db_type, backup_time))
            .await
            .expect("db module should be stored");
        if enabled {
            self.registry
                .set_enabled(name, true)
                .await
                .expect("job should be enabled");
        }
        self
    }

    /// Configure and enable remote sync for a job
    pub async fn add_remote(&self, name: &str, base_path: &str, retention_count: Option<u32>) -> &Self {
        self.registry
            .upsert_module_config(
                name,
                ModuleKind::RemoteSync,
                &remote_module(base_path, retention_count),
            )
            .await
            .expect("remote module should be stored");
        self.registry
            .set_module_enabled(name, ModuleKind::RemoteSync, true)
            .await
            .expect("remote sync should be enabled");
        self
    }

    /// Configure and enable the webhook notifier for a job
    pub async fn add_notify(&self, name: &str, webhook_url: &str) -> &Self {
        self.registry
            .upsert_module_config(name, ModuleKind::Notify, &notify_module(webhook_url))
            .await
            .expect("notify module should be stored");
        self.registry
            .set_module_enabled(name, ModuleKind::Notify, true)
            .await
            .expect("notify should be enabled");
        self
    }
}
