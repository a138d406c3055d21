//! Key material and the software-fallback key derivation.
//!
//! The fallback key is derived from machine-bound material with
//! PBKDF2-HMAC-SHA256 and a fixed application salt. It is tied to the
//! machine: moving the data directory to another host (or changing the
//! hostname, OS account or app version) makes fallback ciphertexts
//! unreadable.

use crate::error::{CryptoError, CryptoResult};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of encryption keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// Fixed salt shared by every installation. Changing it breaks decryption
/// of everything previously written through the fallback path.
pub const FALLBACK_SALT: &[u8] = b"haven.safe-storage.fallback.v1";

/// Lowest iteration count accepted for the fallback derivation.
pub const MIN_FALLBACK_ITERATIONS: u32 = 100_000;

/// An encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Inputs to the fallback key: machine identity, platform and app version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackKeyMaterial {
    pub machine_id: String,
    pub platform: String,
    pub app_version: String,
}

impl FallbackKeyMaterial {
    /// Material for the machine this process runs on.
    #[must_use]
    pub fn current(app_version: &str) -> Self {
        Self {
            machine_id: crate::machine::MachineIdentity::current().id().to_string(),
            platform: std::env::consts::OS.to_string(),
            app_version: app_version.to_string(),
        }
    }

    fn password(&self) -> String {
        format!("{}{}{}", self.machine_id, self.platform, self.app_version)
    }
}

/// Fallback derivation parameters.
#[derive(Clone, Debug)]
pub struct FallbackKdfParams {
    /// PBKDF2 iteration count.
    pub iterations: u32,
}

impl Default for FallbackKdfParams {
    fn default() -> Self {
        Self {
            iterations: MIN_FALLBACK_ITERATIONS,
        }
    }
}

/// Derives the software-fallback key.
///
/// Fails when the material is empty or the iteration count is below
/// [`MIN_FALLBACK_ITERATIONS`].
pub fn derive_fallback_key(
    material: &FallbackKeyMaterial,
    params: &FallbackKdfParams,
) -> CryptoResult<DerivedKey> {
    if material.machine_id.trim().is_empty() {
        return Err(CryptoError::KeyDerivation("machine identity is empty".into()));
    }
    if params.iterations < MIN_FALLBACK_ITERATIONS {
        return Err(CryptoError::KeyDerivation(format!(
            "iteration count {} below minimum {}",
            params.iterations, MIN_FALLBACK_ITERATIONS
        )));
    }

    let mut password = material.password();
    let mut key_bytes = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        FALLBACK_SALT,
        params.iterations,
        &mut key_bytes,
    );
    password.zeroize();

    let key = DerivedKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Generates a random encryption key (keychain master keys).
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}
