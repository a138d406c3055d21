//! Encrypted runtime store for Haven.
//!
//! Two layers share one set of runtime maps:
//!
//! - **Secure cells**: each secure value individually encrypted, decrypted
//!   lazily into a memory-only cache.
//! - **Blob lifecycle**: the whole store (plain and secure maps) encrypted
//!   as one blob at shutdown and restored at startup.
//!
//! [`DesktopStore`] routes keys between plain and secure storage using
//! [`is_secure_key`] and publishes every write on a [`ChangeFeed`];
//! [`QuitCoordinator`] ties the shutdown seal to the
//! host's quit signal.

mod backend;
mod cache;
mod cell;
mod classify;
mod error;
mod events;
mod fsio;
mod lifecycle;
mod quit;
mod runtime;
mod store;

pub use backend::{JsonFileBackend, KvBackend, MemoryBackend};
pub use cache::{CLEARTEXT_PREFIX, PlaintextCache};
pub use cell::SecureCellStore;
pub use classify::{SECURE_INFIX, SECURE_PREFIX, SECURE_SUFFIXES, is_secure_key};
pub use error::{VaultError, VaultResult};
pub use events::{ChangeFeed, ChangeSink, REDACTED_MARKER, StoreChange, redacted};
pub use fsio::{DIR_PERMISSIONS, FILE_PERMISSIONS, create_private_dir, write_private_file};
pub use lifecycle::{
    BLOB_FORMAT_VERSION, BLOB_KEY, BlobLifecycle, BlobMetadata, InitOutcome, PersistedBlob,
    SealOutcome,
};
pub use quit::{DEFAULT_SHUTDOWN_TIMEOUT, ProcessControl, QuitCoordinator, QuitSignal, StdProcess};
pub use runtime::StorePhase;
pub use store::DesktopStore;
