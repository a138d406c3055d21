//! Platform string-encryption capabilities.
//!
//! The safe-storage adapter treats the platform as opaque: anything that
//! can turn a string into bytes and back, plus an availability hint.
//! The OS keychain implementation keeps a random master key in the
//! keychain and seals with it locally.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, generate_random_key};
use std::sync::OnceLock;
use tracing::{debug, warn};
use zeroize::Zeroize;

/// Keychain service name.
pub const KEYCHAIN_SERVICE: &str = "Haven Safe Storage";

/// Keychain account holding the master key.
pub const KEYCHAIN_ACCOUNT: &str = "master-key";

/// A platform-provided reversible string encryption capability.
pub trait PlatformEncryption: Send + Sync {
    /// Encrypts `plaintext` into an opaque byte string.
    fn encrypt_string(&self, plaintext: &str) -> CryptoResult<Vec<u8>>;

    /// Decrypts bytes produced by `encrypt_string`.
    fn decrypt_string(&self, data: &[u8]) -> CryptoResult<String>;

    /// Non-authoritative availability hint.
    fn is_available(&self) -> bool;
}

/// Platform capability backed by a key the caller already holds.
///
/// Used for keychain-loaded keys and by embedders that source the key
/// from their own secure enclave.
pub struct KeyedPlatform {
    key: DerivedKey,
}

impl KeyedPlatform {
    pub fn new(key: DerivedKey) -> Self {
        Self { key }
    }
}

impl PlatformEncryption for KeyedPlatform {
    fn encrypt_string(&self, plaintext: &str) -> CryptoResult<Vec<u8>> {
        cipher::seal_string(&self.key, plaintext)
    }

    fn decrypt_string(&self, data: &[u8]) -> CryptoResult<String> {
        cipher::open_string(&self.key, data)
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// A platform without any encryption capability (headless Linux without
/// a secret service, sandboxed CI, ...).
pub struct UnavailablePlatform;

impl PlatformEncryption for UnavailablePlatform {
    fn encrypt_string(&self, _plaintext: &str) -> CryptoResult<Vec<u8>> {
        Err(CryptoError::Unavailable("no platform encryption".into()))
    }

    fn decrypt_string(&self, _data: &[u8]) -> CryptoResult<String> {
        Err(CryptoError::Decryption("no platform encryption".into()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// OS keychain backed capability.
///
/// The master key is fetched (or generated and stored) on first use and
/// cached for the process lifetime. A keychain failure on that first
/// access marks the platform unavailable until restart.
pub struct KeychainPlatform {
    service: String,
    account: String,
    loaded: OnceLock<Option<KeyedPlatform>>,
}

impl KeychainPlatform {
    pub fn new() -> Self {
        Self::with_entry(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)
    }

    pub fn with_entry(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
            loaded: OnceLock::new(),
        }
    }

    fn inner(&self) -> Option<&KeyedPlatform> {
        self.loaded
            .get_or_init(|| match self.load_or_create_key() {
                Ok(key) => Some(KeyedPlatform::new(key)),
                Err(e) => {
                    warn!(error = %e, "OS keychain unavailable, safe storage will use the fallback cipher");
                    None
                }
            })
            .as_ref()
    }

    fn load_or_create_key(&self) -> CryptoResult<DerivedKey> {
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| CryptoError::Keychain(e.to_string()))?;

        match entry.get_secret() {
            Ok(mut secret) => {
                let key = DerivedKey::from_slice(&secret);
                secret.zeroize();
                key
            }
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "Generating safe-storage master key");
                let key = generate_random_key();
                entry
                    .set_secret(key.as_bytes())
                    .map_err(|e| CryptoError::Keychain(e.to_string()))?;
                Ok(key)
            }
            Err(e) => Err(CryptoError::Keychain(e.to_string())),
        }
    }
}

impl Default for KeychainPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformEncryption for KeychainPlatform {
    fn encrypt_string(&self, plaintext: &str) -> CryptoResult<Vec<u8>> {
        self.inner()
            .ok_or_else(|| CryptoError::Unavailable("keychain unavailable".into()))?
            .encrypt_string(plaintext)
    }

    fn decrypt_string(&self, data: &[u8]) -> CryptoResult<String> {
        self.inner()
            .ok_or_else(|| CryptoError::Decryption("keychain unavailable".into()))?
            .decrypt_string(data)
    }

    fn is_available(&self) -> bool {
        self.inner().is_some()
    }
}
