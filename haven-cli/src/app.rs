//! Service wiring.
//!
//! Every service object is constructed once here and shared by reference.
//! [`Haven::shutdown`] runs the exit sequence: flush profiles, then seal the
//! desktop store, bounded by the configured timeout.

use crate::config::{APP_STORE_NAME, HavenConfig};
use anyhow::{Context, Result};
use haven_crypto::{FallbackKeyMaterial, PlatformEncryption, SafeStorage, StringEncryptor};
use haven_settings::{EnvSource, SettingsResolver, WatchRegistry};
use haven_storage::{DirSessionProvider, ProfileStore, StartupSignal};
use haven_vault::{
    DesktopStore, InitOutcome, JsonFileBackend, ProcessControl, QuitCoordinator, QuitSignal,
    SealOutcome, create_private_dir,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct Haven {
    pub config: HavenConfig,
    pub app: Arc<DesktopStore>,
    pub profiles: ProfileStore,
    pub settings: SettingsResolver,
}

impl Haven {
    /// Opens every store under the configured data directory.
    pub async fn open(
        config: HavenConfig,
        platform: Arc<dyn PlatformEncryption>,
        env: Arc<dyn EnvSource>,
    ) -> Result<Self> {
        create_private_dir(config.data_dir())
            .with_context(|| format!("creating {}", config.data_dir().display()))?;

        let encryptor: Arc<dyn StringEncryptor> = Arc::new(SafeStorage::new(
            platform,
            FallbackKeyMaterial::current(&config.app_version),
            config.kdf_params(),
        ));
        if !encryptor.is_available() {
            warn!("Platform encryption unavailable, using the machine-bound fallback key");
        }

        let backend = JsonFileBackend::open(config.data_dir(), APP_STORE_NAME)
            .context("opening desktop store")?;
        let app = Arc::new(DesktopStore::new(Arc::new(backend), encryptor.clone()));
        match app.lifecycle().initialize_store()? {
            InitOutcome::FirstLaunch => app.lifecycle().complete_onboarding(),
            InitOutcome::Discarded { reason } => {
                warn!(reason = %reason, "Desktop store was reset");
            }
            outcome => debug!(outcome = ?outcome, "Desktop store ready"),
        }

        let startup = StartupSignal::default();
        let profiles = ProfileStore::new(
            config.profile_store(),
            encryptor,
            Arc::new(DirSessionProvider::new(config.sessions_dir())),
            startup.clone(),
        );
        startup.fire();
        profiles.initialize().await.context("loading profiles")?;

        let settings =
            SettingsResolver::new(app.clone(), profiles.clone(), env, WatchRegistry::new());

        info!(data_dir = %config.data_dir().display(), "Haven opened");
        Ok(Self {
            config,
            app,
            profiles,
            settings,
        })
    }

    /// Flushes profiles and seals the desktop store.
    pub async fn shutdown(&self) -> SealOutcome {
        let coordinator = QuitCoordinator::new(
            self.app.clone(),
            Arc::new(ReturnToCaller),
            self.config.shutdown_timeout,
        );
        let profiles = self.profiles.clone();
        coordinator
            .handle_before_quit(&CommandFinished, async move {
                if let Err(e) = profiles.flush().await {
                    error!(error = %e, "Failed to flush profiles");
                }
            })
            .await
    }
}

/// The command finished; nothing else is waiting to terminate the process.
struct CommandFinished;

impl QuitSignal for CommandFinished {
    fn prevent_default(&self) {}
}

/// Lets `main` return so its exit code reflects the command result.
struct ReturnToCaller;

impl ProcessControl for ReturnToCaller {
    fn exit(&self, code: i32) {
        debug!(code, "Shutdown sequence complete");
    }
}
