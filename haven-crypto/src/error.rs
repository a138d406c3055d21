//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key, tampered data, foreign machine).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Neither the platform capability nor the software fallback could
    /// produce a ciphertext.
    #[error("encryption unavailable: {0}")]
    Unavailable(String),

    /// OS keychain access failed.
    #[error("keychain error: {0}")]
    Keychain(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

impl CryptoError {
    /// True when the error means "this ciphertext cannot be recovered",
    /// which callers treat as an absent value rather than a failure.
    #[must_use]
    pub fn is_unrecoverable_value(&self) -> bool {
        matches!(self, Self::Decryption(_))
    }
}
