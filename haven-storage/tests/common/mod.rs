//! Shared test helpers for profile store tests.

#![allow(dead_code)]

use haven_crypto::{
    DerivedKey, FallbackKdfParams, FallbackKeyMaterial, KeyedPlatform, SafeStorage,
    StringEncryptor,
};
use haven_storage::{
    ProfileSettingChange, ProfileStore, ProfileStoreConfig, SessionProvider, StartupSignal,
};
use haven_vault::ChangeSink;
use haven_types::ProfileId;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

pub fn encryptor(seed: u8) -> Arc<dyn StringEncryptor> {
    Arc::new(SafeStorage::new(
        Arc::new(KeyedPlatform::new(DerivedKey::from_bytes([seed; 32]))),
        FallbackKeyMaterial {
            machine_id: "storage-tests".into(),
            platform: "linux".into(),
            app_version: "0.4.0".into(),
        },
        FallbackKdfParams::default(),
    ))
}

/// Session provider that records calls instead of touching disk.
#[derive(Default)]
pub struct RecordingSessions {
    pub created: Mutex<Vec<ProfileId>>,
    pub destroyed: Mutex<Vec<ProfileId>>,
}

impl SessionProvider for RecordingSessions {
    fn create(&self, profile: ProfileId) -> std::io::Result<()> {
        self.created.lock().push(profile);
        Ok(())
    }

    fn destroy(&self, profile: ProfileId) -> std::io::Result<()> {
        self.destroyed.lock().push(profile);
        Ok(())
    }
}

pub fn store_at(dir: &Path, seed: u8, sessions: Arc<RecordingSessions>) -> ProfileStore {
    ProfileStore::new(
        ProfileStoreConfig::new(dir),
        encryptor(seed),
        sessions,
        StartupSignal::fired(),
    )
}

/// Initialized store in `dir`, plus its session recorder.
pub async fn open_store(dir: &Path) -> (ProfileStore, Arc<RecordingSessions>) {
    let sessions = Arc::new(RecordingSessions::default());
    let store = store_at(dir, 1, sessions.clone());
    store.initialize().await.unwrap();
    (store, sessions)
}

/// Collects profile settings changes.
#[derive(Default)]
pub struct ChangeLog {
    events: Mutex<Vec<ProfileSettingChange>>,
}

impl ChangeLog {
    pub fn take(&self) -> Vec<ProfileSettingChange> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl ChangeSink<ProfileSettingChange> for ChangeLog {
    fn on_change(&self, event: &ProfileSettingChange) {
        self.events.lock().push(event.clone());
    }
}
