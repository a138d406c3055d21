//! The encryption interface every store depends on.
//!
//! Consumers (the secure cell store, the blob lifecycle, the profile
//! store) hold an `Arc<dyn StringEncryptor>` and never see key material.
//! `SafeStorage` is the production implementation: platform capability
//! first, machine-bound software fallback second.

use crate::error::{CryptoError, CryptoResult};
use crate::fallback::FallbackCipher;
use crate::key::{FallbackKdfParams, FallbackKeyMaterial};
use crate::platform::PlatformEncryption;
use base64::{Engine, engine::general_purpose::STANDARD};
use std::sync::Arc;
use tracing::warn;

/// Scheme tag for ciphertexts produced by the platform capability.
pub const PLATFORM_TAG: &str = "p1";

/// Scheme tag for ciphertexts produced by the software fallback.
pub const FALLBACK_TAG: &str = "f1";

/// Reversible string encryption.
pub trait StringEncryptor: Send + Sync {
    /// Encrypts `plaintext`. An error means nothing may be persisted.
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String>;

    /// Decrypts a ciphertext produced by `encrypt`.
    ///
    /// `CryptoError::Decryption` means the value is unrecoverable; callers
    /// drop that single value instead of failing.
    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String>;

    /// Non-authoritative hint; `encrypt`/`decrypt` must still be attempted.
    fn is_available(&self) -> bool;
}

/// Which path produced a ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherScheme {
    Platform,
    Fallback,
}

impl CipherScheme {
    /// Reads the scheme tag of a ciphertext without decrypting it.
    pub fn of(ciphertext: &str) -> Option<Self> {
        match ciphertext.split_once(':') {
            Some((PLATFORM_TAG, _)) => Some(Self::Platform),
            Some((FALLBACK_TAG, _)) => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// Platform encryption with a machine-bound software fallback.
pub struct SafeStorage {
    platform: Arc<dyn PlatformEncryption>,
    fallback: FallbackCipher,
}

impl SafeStorage {
    pub fn new(
        platform: Arc<dyn PlatformEncryption>,
        material: FallbackKeyMaterial,
        params: FallbackKdfParams,
    ) -> Self {
        Self {
            platform,
            fallback: FallbackCipher::new(material, params),
        }
    }

    fn armor(tag: &str, bytes: &[u8]) -> String {
        format!("{tag}:{}", STANDARD.encode(bytes))
    }

    fn unarmor(body: &str) -> CryptoResult<Vec<u8>> {
        STANDARD
            .decode(body)
            .map_err(|e| CryptoError::Decryption(format!("invalid base64: {}", e)))
    }
}

impl StringEncryptor for SafeStorage {
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        if self.platform.is_available() {
            match self.platform.encrypt_string(plaintext) {
                Ok(bytes) => return Ok(Self::armor(PLATFORM_TAG, &bytes)),
                Err(e) => warn!(error = %e, "Platform encryption failed, using fallback cipher"),
            }
        }

        let bytes = self.fallback.encrypt(plaintext).map_err(|e| match e {
            CryptoError::Unavailable(msg) => CryptoError::Unavailable(msg),
            other => CryptoError::Unavailable(other.to_string()),
        })?;
        Ok(Self::armor(FALLBACK_TAG, &bytes))
    }

    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        let Some((tag, body)) = ciphertext.split_once(':') else {
            return Err(CryptoError::Decryption("missing scheme tag".into()));
        };
        match tag {
            PLATFORM_TAG => {
                if !self.platform.is_available() {
                    return Err(CryptoError::Decryption(
                        "platform encryption unavailable".into(),
                    ));
                }
                self.platform.decrypt_string(&Self::unarmor(body)?)
            }
            FALLBACK_TAG => self.fallback.decrypt(&Self::unarmor(body)?),
            other => Err(CryptoError::Decryption(format!("unknown scheme tag {other:?}"))),
        }
    }

    fn is_available(&self) -> bool {
        self.platform.is_available()
    }
}
