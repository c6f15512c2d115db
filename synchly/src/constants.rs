//! Central repository for default paths, timeouts and CLI strings

use std::time::Duration;

/// Default locations, relative to the working directory
pub mod paths {
    pub const DEFAULT_SETTINGS_PATH: &str = "config/synchly.toml";

    /// Environment variable that overrides the settings path
    pub const SETTINGS_ENV_VAR: &str = "SYNCHLY_CONFIG";

    pub const DEFAULT_DATABASE_PATH: &str = "data/synchly.db";

    pub const DEFAULT_BACKUP_DIR: &str = "data/backups";
}

/// Network timeouts
pub mod timeouts {
    use super::Duration;

    /// Timeout for establishing an SSH session to the remote endpoint
    pub const REMOTE_CONNECT_SECONDS: u64 = 30;

    /// Timeout for a single webhook delivery
    pub const NOTIFY_SECONDS: u64 = 10;

    /// Timeout for a database connectivity check
    pub const DB_CONNECT_CHECK: Duration = Duration::from_secs(30);
}

/// Job defaults
pub mod jobs {
    /// Job used when `--job` is not given
    pub const DEFAULT_JOB_NAME: &str = "master";

    /// Timestamp format used in archive names
    pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
}

/// User facing strings of the CLI
pub mod strings {
    pub const STARTED: &str = "synchly scheduler started, waiting for triggers (Ctrl-C to stop)";

    pub const RESTART_NOTICE: &str =
        "Schedules are read once at start; restart the scheduler after changing a job's backup time";

    pub const DEBUG_HINT: &str = "Re-run with --debug (-D) to see the full error details";

    pub const RESET_CONFIRM_HINT: &str =
        "Resetting removes the job's whole configuration; re-run with --reset --yes to confirm";

    pub const FILE_WITHOUT_CONFIG: &str =
        "Flag --file can only be used together with --config <db|remote-sync|notify>";

    pub const INTERACTIVE_UNSUPPORTED: &str =
        "Interactive setup is not available; pass the module configuration with --file <path>";
}
