use std::path::PathBuf;

use crate::domain::{AppConfig, DomainError};

/// Persistent storage for `AppConfig`.
pub trait ConfigStore: Send + Sync {
    /// Load the stored configuration, writing defaults on first run.
    fn load(&self) -> Result<AppConfig, DomainError>;

    fn save(&self, config: &AppConfig) -> Result<(), DomainError>;

    /// Stored configuration with `VOXAI_*` environment overrides applied.
    /// Overrides are never written back.
    fn load_effective(&self) -> Result<AppConfig, DomainError> {
        let mut config = self.load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn config_path(&self) -> PathBuf;

    fn data_dir(&self) -> PathBuf;

    fn logs_dir(&self) -> PathBuf;
}
