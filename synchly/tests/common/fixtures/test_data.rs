//! Common test data and module documents

use serde_json::{json, Value};

/// Common job names
pub mod jobs {
    pub const MASTER: &str = "master";
    pub const JOB_A: &str = "a";
    pub const JOB_B: &str = "b";
    pub const JOB_C: &str = "c";
}

/// Common remote locations
pub mod remote {
    pub const HOST: &str = "backup.example.test";
    pub const BASE_PATH: &str = "/srv/backups";
}

pub fn db_module(db_type: &str, backup_time: &str) -> Value {
    json!({
        "db_type": db_type,
        "host": "127.0.0.1",
        "port": 27017,
        "username": "backup",
        "password": "secret",
        "database": "appdb",
        "backup_time": backup_time,
    })
}

pub fn remote_module(base_path: &str, retention_count: Option<u32>) -> Value {
    json!({
        "host": remote::HOST,
        "port": 22,
        "auth_user": "backup",
        "auth_password": "secret",
        "remote_base_path": base_path,
        "retention_count": retention_count,
    })
}

pub fn notify_module(webhook_url: &str) -> Value {
    json!({ "webhook_url": webhook_url })
}
