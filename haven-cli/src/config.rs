//! Process configuration.

use haven_crypto::{FallbackKdfParams, MIN_FALLBACK_ITERATIONS};
use haven_storage::{DEFAULT_SAVE_DEBOUNCE, ProfileStoreConfig};
use haven_vault::DEFAULT_SHUTDOWN_TIMEOUT;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "HAVEN_DATA_DIR";

/// Directory created under the platform data directory.
pub const APP_DIR_NAME: &str = "Haven";

/// Name of the desktop store file inside the data directory.
pub const APP_STORE_NAME: &str = "config";

/// Session partitions live under this subdirectory.
pub const SESSIONS_DIR: &str = "sessions";

#[derive(Debug, Clone)]
pub struct HavenConfig {
    pub data_dir: PathBuf,
    pub app_version: String,
    /// Quiet period for history writes.
    pub save_debounce: Duration,
    /// Bound on the whole exit sequence.
    pub shutdown_timeout: Duration,
    pub kdf_iterations: u32,
}

impl Default for HavenConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            kdf_iterations: MIN_FALLBACK_ITERATIONS,
        }
    }
}

impl HavenConfig {
    /// Defaults with the data directory taken from the command line flag,
    /// else from `HAVEN_DATA_DIR`.
    pub fn from_env(flag: Option<PathBuf>) -> Self {
        Self::resolve(flag, std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
    }

    /// Applies the data directory overrides. The flag wins over the
    /// environment; an empty environment value is ignored.
    pub fn resolve(flag: Option<PathBuf>, env: Option<PathBuf>) -> Self {
        let mut config = Self::default();
        let env = env.filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = flag.or(env) {
            config.data_dir = dir;
        }
        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join(SESSIONS_DIR)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(format!("{APP_STORE_NAME}.json"))
    }

    pub fn profile_store(&self) -> ProfileStoreConfig {
        ProfileStoreConfig {
            data_dir: self.data_dir.clone(),
            debounce: self.save_debounce,
        }
    }

    pub fn kdf_params(&self) -> FallbackKdfParams {
        FallbackKdfParams {
            iterations: self.kdf_iterations,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
