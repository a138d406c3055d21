//! Safe-storage encryption for Haven.
//!
//! Wraps a platform string-encryption capability (OS keychain) with a
//! software fallback whose key is derived from machine identity. Every
//! ciphertext is a tagged base64 string, so values written by either path
//! stay readable as long as that path's key is.
//!
//! The fallback is defense-in-depth against casual disk inspection, not
//! against a local attacker who can run code as the user.

mod cipher;
mod encryptor;
mod error;
mod fallback;
mod key;
mod machine;
mod platform;

pub use cipher::{NONCE_SIZE, TAG_SIZE, open, open_string, seal, seal_string};
pub use encryptor::{CipherScheme, FALLBACK_TAG, PLATFORM_TAG, SafeStorage, StringEncryptor};
pub use error::{CryptoError, CryptoResult};
pub use fallback::FallbackCipher;
pub use key::{
    DerivedKey, FALLBACK_SALT, FallbackKdfParams, FallbackKeyMaterial, KEY_SIZE,
    MIN_FALLBACK_ITERATIONS, derive_fallback_key, generate_random_key,
};
pub use machine::MachineIdentity;
pub use platform::{KeychainPlatform, KeyedPlatform, PlatformEncryption, UnavailablePlatform};
