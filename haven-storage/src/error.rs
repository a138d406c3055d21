//! Error types for the profile store.

use crate::validation::ValidationError;
use haven_types::ProfileId;
use thiserror::Error;

/// Result type for profile store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in profile store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Operation invoked before [`crate::ProfileStore::initialize`] finished.
    #[error("profile store not initialized")]
    NotInitialized,

    /// Initialization attempted before the host signalled startup.
    #[error("profile store initialized before the application was ready")]
    AppNotReady,

    /// No profile with this id.
    #[error("profile not found: {0}")]
    ProfileNotFound(ProfileId),

    /// Entity inside a profile not found.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Input rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Encryption failed; secure settings have no cleartext fallback.
    #[error("encryption error: {0}")]
    Crypto(#[from] haven_crypto::CryptoError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
