//! Error types for settings resolution.

use haven_types::ObserverId;
use thiserror::Error;

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors that can occur in settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Key looks like an API key but names no known type.
    #[error("invalid API key type: {0}")]
    InvalidKeyType(String),

    /// Value has the wrong shape for this key.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// A profile-scoped setting was written with no active profile.
    #[error("no active profile")]
    NoActiveProfile,

    /// Observer is not connected to the registry.
    #[error("unknown observer: {0}")]
    UnknownObserver(ObserverId),

    /// Profile store error.
    #[error("profile store error: {0}")]
    Storage(#[from] haven_storage::StorageError),

    /// App settings backend error.
    #[error("settings store error: {0}")]
    Backend(#[from] haven_vault::VaultError),
}
