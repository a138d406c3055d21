//! Whole-store blob lifecycle.
//!
//! At startup the single encrypted blob is decrypted into the runtime
//! maps; at shutdown the maps are serialized, encrypted as one unit,
//! written back under [`BLOB_KEY`] and cleared. The on-disk blob is
//! therefore always one cycle behind the running process.

use crate::backend::KvBackend;
use crate::error::VaultResult;
use crate::runtime::{SharedRuntime, StorePhase};
use chrono::{DateTime, Utc};
use haven_crypto::StringEncryptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Backend key holding the encrypted blob.
pub const BLOB_KEY: &str = "encryptedStore";

/// Blob format version written into metadata.
pub const BLOB_FORMAT_VERSION: &str = "1";

/// Blob metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub encrypted_at: DateTime<Utc>,
    pub version: String,
}

/// Decrypted blob document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedBlob {
    pub plain: Map<String, Value>,
    pub secure: BTreeMap<String, String>,
    pub metadata: BlobMetadata,
}

/// Result of [`BlobLifecycle::initialize_store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// Nothing persisted yet; waiting for onboarding to complete.
    FirstLaunch,
    /// No blob, but the store held other data; starting empty.
    Empty,
    /// Blob restored into runtime maps.
    Restored { plain: usize, secure: usize },
    /// Blob was unreadable and has been deleted; starting empty.
    Discarded { reason: String },
    /// Already initialized earlier in this process.
    AlreadyInitialized,
}

/// Result of the shutdown encryption cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealOutcome {
    /// Blob written and runtime maps cleared.
    Sealed { plain: usize, secure: usize },
    /// Nothing to seal (store never initialized).
    Skipped,
    /// Encryption or write failed; the previous blob is left untouched.
    Failed { reason: String },
}

/// Owns the persisted blob and the runtime phase transitions.
pub struct BlobLifecycle {
    backend: Arc<dyn KvBackend>,
    encryptor: Arc<dyn StringEncryptor>,
    runtime: SharedRuntime,
    seal: OnceCell<SealOutcome>,
}

impl BlobLifecycle {
    pub(crate) fn new(
        backend: Arc<dyn KvBackend>,
        encryptor: Arc<dyn StringEncryptor>,
        runtime: SharedRuntime,
    ) -> Self {
        Self {
            backend,
            encryptor,
            runtime,
            seal: OnceCell::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> StorePhase {
        self.runtime.read().phase
    }

    /// True iff no blob exists and the store is otherwise empty.
    pub fn is_first_launch(&self) -> VaultResult<bool> {
        Ok(!self.backend.contains(BLOB_KEY)? && self.backend.is_empty()?)
    }

    /// Loads the blob into the runtime maps.
    ///
    /// Decrypt or parse failures delete the blob and leave the store
    /// empty; only backend I/O errors are returned.
    pub fn initialize_store(&self) -> VaultResult<InitOutcome> {
        if self.phase() != StorePhase::Uninitialized {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        if self.is_first_launch()? {
            info!("First launch, store initialization deferred until onboarding completes");
            self.runtime.write().phase = StorePhase::FirstLaunch;
            return Ok(InitOutcome::FirstLaunch);
        }

        let Some(raw) = self.backend.get(BLOB_KEY)? else {
            self.runtime.write().phase = StorePhase::Runtime;
            return Ok(InitOutcome::Empty);
        };

        let blob = match self.open_blob(&raw) {
            Ok(blob) => blob,
            Err(reason) => {
                error!(reason = %reason, "Encrypted store unreadable, discarding it");
                if let Err(e) = self.backend.delete(BLOB_KEY) {
                    error!(error = %e, "Failed to delete corrupted store blob");
                }
                let mut rt = self.runtime.write();
                rt.clear();
                rt.phase = StorePhase::Runtime;
                return Ok(InitOutcome::Discarded { reason });
            }
        };

        let (plain, secure) = (blob.plain.len(), blob.secure.len());
        {
            let mut rt = self.runtime.write();
            rt.plain = blob.plain;
            rt.secure = blob.secure;
            rt.decrypted.clear();
            rt.phase = StorePhase::Loaded;
        }
        debug!(
            encrypted_at = %blob.metadata.encrypted_at,
            version = %blob.metadata.version,
            "Store blob decrypted"
        );

        self.runtime.write().phase = StorePhase::Runtime;
        info!(plain, secure, "Store restored");
        Ok(InitOutcome::Restored { plain, secure })
    }

    fn open_blob(&self, raw: &Value) -> Result<PersistedBlob, String> {
        let ciphertext = raw
            .as_str()
            .ok_or_else(|| "blob is not a string".to_string())?;
        let json = self
            .encryptor
            .decrypt(ciphertext)
            .map_err(|e| e.to_string())?;
        serde_json::from_str(&json).map_err(|e| format!("invalid blob document: {e}"))
    }

    /// Signals that onboarding finished; a first-launch store starts serving.
    pub fn complete_onboarding(&self) {
        let mut rt = self.runtime.write();
        if rt.phase == StorePhase::FirstLaunch {
            rt.phase = StorePhase::Runtime;
            info!("Onboarding complete, store is live");
        }
    }

    /// Seals the runtime maps into the blob, at most once per process.
    ///
    /// Concurrent and repeated callers all await the same cycle and get
    /// the same outcome.
    pub async fn encrypt_store_on_exit(&self) -> SealOutcome {
        self.seal
            .get_or_init(|| async { self.seal_once() })
            .await
            .clone()
    }

    fn seal_once(&self) -> SealOutcome {
        let snapshot = {
            let mut rt = self.runtime.write();
            if !rt.phase.is_open() {
                debug!(phase = ?rt.phase, "Nothing to seal");
                return SealOutcome::Skipped;
            }
            rt.phase = StorePhase::Encrypting;
            PersistedBlob {
                plain: rt.plain.clone(),
                secure: rt.secure.clone(),
                metadata: BlobMetadata {
                    encrypted_at: Utc::now(),
                    version: BLOB_FORMAT_VERSION.to_string(),
                },
            }
        };
        let (plain, secure) = (snapshot.plain.len(), snapshot.secure.len());

        let outcome = match self.write_blob(&snapshot) {
            Ok(()) => {
                info!(plain, secure, "Store sealed");
                SealOutcome::Sealed { plain, secure }
            }
            Err(reason) => {
                error!(reason = %reason, "Store seal failed, previous blob kept");
                SealOutcome::Failed { reason }
            }
        };

        let mut rt = self.runtime.write();
        rt.clear();
        rt.phase = StorePhase::Terminated;
        outcome
    }

    fn write_blob(&self, blob: &PersistedBlob) -> Result<(), String> {
        let json = serde_json::to_string(blob).map_err(|e| e.to_string())?;
        let ciphertext = self.encryptor.encrypt(&json).map_err(|e| e.to_string())?;
        self.backend
            .set(BLOB_KEY, Value::String(ciphertext))
            .map_err(|e| e.to_string())
    }
}
