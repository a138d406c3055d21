//! Shared test helpers for vault tests.

#![allow(dead_code)]

use haven_crypto::{
    CryptoError, CryptoResult, DerivedKey, FallbackKdfParams, FallbackKeyMaterial, KeyedPlatform,
    SafeStorage, StringEncryptor,
};
use haven_vault::{ChangeSink, KvBackend, MemoryBackend, StoreChange, VaultResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Safe storage keyed by a deterministic platform key.
pub fn encryptor(seed: u8) -> Arc<dyn StringEncryptor> {
    Arc::new(SafeStorage::new(
        Arc::new(KeyedPlatform::new(DerivedKey::from_bytes([seed; 32]))),
        FallbackKeyMaterial {
            machine_id: "vault-tests".into(),
            platform: "linux".into(),
            app_version: "0.4.0".into(),
        },
        FallbackKdfParams::default(),
    ))
}

/// Encryptor that refuses one exact plaintext and passes everything else
/// to a real one.
pub struct SelectiveEncryptor {
    pub inner: Arc<dyn StringEncryptor>,
    pub refuse: String,
}

impl StringEncryptor for SelectiveEncryptor {
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        if plaintext == self.refuse {
            return Err(CryptoError::Unavailable("refused".into()));
        }
        self.inner.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        self.inner.decrypt(ciphertext)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Memory backend that counts writes and deletes.
#[derive(Default)]
pub struct CountingBackend {
    pub inner: MemoryBackend,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingBackend {
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl KvBackend for CountingBackend {
    fn get(&self, key: &str) -> VaultResult<Option<Value>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> VaultResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> VaultResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key)
    }

    fn keys(&self) -> VaultResult<Vec<String>> {
        self.inner.keys()
    }
}

/// Collects store change events.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<StoreChange>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<StoreChange> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl ChangeSink<StoreChange> for Recorder {
    fn on_change(&self, event: &StoreChange) {
        self.events.lock().push(event.clone());
    }
}
