use crate::error::{LockyardError, Result};
use crate::locking::wait::{LockWait, LockWaitResolution, LockWaitResolver};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "lockyard.toml";
pub const WAIT_ENV: &str = "LOCKYARD_WAIT";
pub const LOCK_DIR_ENV: &str = "LOCKYARD_LOCK_DIR";
const DEFAULT_RETRY_INTERVAL_MS: u64 = 50;
const LOCK_DIR_NAME: &str = "lockyard";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LockyardConfig {
    #[serde(default)]
    pub locking: LockingConfig,

    #[serde(default)]
    pub file: FileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockingConfig {
    #[serde(default)]
    pub wait: LockWait,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            wait: LockWait::default(),
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
        }
    }
}

impl LockingConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn default_retry_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL_MS
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl LockyardConfig {
    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file not found at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: LockyardConfig = toml::from_str(&contents).map_err(|e| {
            LockyardError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;

        log::debug!("Loaded config from {path:?}");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| LockyardError::ConfigError(format!("Failed to serialize config: {e}")))?;

        fs::write(path, contents)?;
        log::debug!("Saved config to {path:?}");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.locking.retry_interval_ms == 0 {
            return Err(LockyardError::InvalidConfig(
                "locking.retry_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Default config location: `<config dir>/lockyard/lockyard.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(LOCK_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Lock directory from `LOCKYARD_LOCK_DIR`, then config, then the runtime
    /// or temp directory.
    pub fn lock_directory(&self) -> PathBuf {
        if let Some(dir) = env::var_os(LOCK_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.file.directory {
            return dir.clone();
        }
        dirs::runtime_dir()
            .unwrap_or_else(env::temp_dir)
            .join(LOCK_DIR_NAME)
    }

    /// Effective wait with CLI > `LOCKYARD_WAIT` > config > default precedence.
    pub fn resolve_wait(&self, cli_override: Option<&str>) -> Result<LockWaitResolution> {
        let env_value = env::var(WAIT_ENV).ok().filter(|v| !v.trim().is_empty());
        LockWaitResolver::new(
            cli_override,
            env_value.as_deref(),
            self.locking.wait,
            LockWait::default(),
        )
        .resolve()
        .map_err(|e| LockyardError::InvalidConfig(e.to_string()))
    }
}
