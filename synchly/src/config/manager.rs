use super::AppConfig;
use crate::constants::paths;
use crate::errors::ConfigError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

pub struct ConfigManager {
    current_config: Arc<AppConfig>,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Load settings from an explicit path, `$SYNCHLY_CONFIG`, or the default location.
    ///
    /// Only a missing file at the default location falls back to built-in
    /// defaults; an explicitly requested file must exist.
    pub async fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let requested = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(paths::SETTINGS_ENV_VAR).map(PathBuf::from));

        match requested {
            Some(path) => {
                let config = Self::read_file(&path).await?;
                Ok(Self::from_config(config, Some(path)))
            }
            None => {
                let path = PathBuf::from(paths::DEFAULT_SETTINGS_PATH);
                if fs::try_exists(&path).await.unwrap_or(false) {
                    let config = Self::read_file(&path).await?;
                    Ok(Self::from_config(config, Some(path)))
                } else {
                    debug!("No settings file at {}, using defaults", path.display());
                    Ok(Self::from_config(AppConfig::default(), None))
                }
            }
        }
    }

    pub fn from_config(config: AppConfig, source: Option<PathBuf>) -> Self {
        Self {
            current_config: Arc::new(config),
            source,
        }
    }

    pub fn get_current_config(&self) -> Arc<AppConfig> {
        self.current_config.clone()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    async fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        // Surface a bad timezone at load time rather than at scheduler start
        config.schedule_timezone()?;

        info!(
            "Settings loaded from {}: database {}, backups in {}",
            path.display(),
            config.database_path,
            config.backup_dir.display()
        );

        Ok(config)
    }
}
