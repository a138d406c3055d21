//! Shared test helpers for settings tests.

#![allow(dead_code)]

use haven_crypto::{
    CryptoResult, DerivedKey, FallbackKdfParams, FallbackKeyMaterial, KeyedPlatform, SafeStorage,
    StringEncryptor,
};
use haven_settings::{EnvSnapshot, SettingsResolver, WatchRegistry};
use haven_storage::{ProfileStore, ProfileStoreConfig, SessionProvider, StartupSignal};
use haven_types::ProfileId;
use haven_vault::{DesktopStore, MemoryBackend};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub fn encryptor(seed: u8) -> Arc<dyn StringEncryptor> {
    Arc::new(SafeStorage::new(
        Arc::new(KeyedPlatform::new(DerivedKey::from_bytes([seed; 32]))),
        FallbackKeyMaterial {
            machine_id: "settings-tests".into(),
            platform: "linux".into(),
            app_version: "0.4.0".into(),
        },
        FallbackKdfParams::default(),
    ))
}

/// Counts encryptions, i.e. secure-storage writes.
pub struct CountingEncryptor {
    inner: Arc<dyn StringEncryptor>,
    pub encrypts: AtomicUsize,
}

impl CountingEncryptor {
    pub fn count(&self) -> usize {
        self.encrypts.load(Ordering::SeqCst)
    }
}

impl StringEncryptor for CountingEncryptor {
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        self.inner.decrypt(ciphertext)
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

struct NoSessions;

impl SessionProvider for NoSessions {
    fn create(&self, _profile: ProfileId) -> std::io::Result<()> {
        Ok(())
    }

    fn destroy(&self, _profile: ProfileId) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct Harness {
    pub _dir: TempDir,
    pub profiles: ProfileStore,
    pub app: Arc<DesktopStore>,
    pub env: Arc<EnvSnapshot>,
    pub secure_writes: Arc<CountingEncryptor>,
    pub resolver: SettingsResolver,
}

impl Harness {
    pub async fn new(env: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let counting = Arc::new(CountingEncryptor {
            inner: encryptor(1),
            encrypts: AtomicUsize::new(0),
        });
        let profiles = ProfileStore::new(
            ProfileStoreConfig::new(dir.path()),
            counting.clone(),
            Arc::new(NoSessions),
            StartupSignal::fired(),
        );
        profiles.initialize().await.unwrap();

        let app = Arc::new(DesktopStore::new(Arc::new(MemoryBackend::new()), encryptor(2)));
        app.lifecycle().initialize_store().unwrap();

        let env = Arc::new(EnvSnapshot::from_pairs(env.iter().copied()));
        let resolver = SettingsResolver::new(
            app.clone(),
            profiles.clone(),
            env.clone(),
            WatchRegistry::new(),
        );

        Self {
            _dir: dir,
            profiles,
            app,
            env,
            secure_writes: counting,
            resolver,
        }
    }

    pub async fn active(&self) -> ProfileId {
        self.profiles.active_profile_id().await.unwrap().unwrap()
    }
}
