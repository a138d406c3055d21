//! Software fallback cipher keyed by the machine-bound derived key.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, FallbackKdfParams, FallbackKeyMaterial, derive_fallback_key};
use std::sync::OnceLock;

/// Symmetric cipher whose key is derived lazily on first use.
///
/// Derivation is slow by construction, so the result (or its failure) is
/// computed once and reused for the process lifetime.
pub struct FallbackCipher {
    material: FallbackKeyMaterial,
    params: FallbackKdfParams,
    key: OnceLock<Result<DerivedKey, String>>,
}

impl FallbackCipher {
    pub fn new(material: FallbackKeyMaterial, params: FallbackKdfParams) -> Self {
        Self {
            material,
            params,
            key: OnceLock::new(),
        }
    }

    fn key(&self) -> CryptoResult<&DerivedKey> {
        self.key
            .get_or_init(|| derive_fallback_key(&self.material, &self.params).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| CryptoError::Unavailable(format!("fallback key: {e}")))
    }

    /// Seals a string with the fallback key.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<Vec<u8>> {
        cipher::seal_string(self.key()?, plaintext)
    }

    /// Opens a string sealed with the fallback key.
    pub fn decrypt(&self, data: &[u8]) -> CryptoResult<String> {
        let key = self
            .key()
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        cipher::open_string(key, data)
    }
}
