//! Error types for the vault layer.

use crate::runtime::StorePhase;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur in vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Encryption/decryption error that could not be absorbed.
    #[error("crypto error: {0}")]
    Crypto(#[from] haven_crypto::CryptoError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The runtime store has not been initialized yet.
    #[error("store not initialized")]
    NotInitialized,

    /// The runtime store is being (or has been) sealed for shutdown.
    #[error("store sealed ({0:?}), runtime access refused")]
    Sealed(StorePhase),
}
