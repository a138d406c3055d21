//! Decrypted runtime state shared by the cell store and the lifecycle.

use crate::cache::PlaintextCache;
use crate::error::{VaultError, VaultResult};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lifecycle phase of the runtime store.
///
/// `Uninitialized → FirstLaunch | Loaded → Runtime → Encrypting → Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorePhase {
    Uninitialized,
    FirstLaunch,
    Loaded,
    Runtime,
    Encrypting,
    Terminated,
}

impl StorePhase {
    /// Whether runtime maps may be read and written in this phase.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::FirstLaunch | Self::Loaded | Self::Runtime)
    }

    pub(crate) fn ensure_open(self) -> VaultResult<()> {
        match self {
            Self::Uninitialized => Err(VaultError::NotInitialized),
            Self::Encrypting | Self::Terminated => Err(VaultError::Sealed(self)),
            _ => Ok(()),
        }
    }
}

/// Runtime maps. Secure values stay ciphertext here; plaintext lives only
/// in `decrypted`, which is never persisted.
pub(crate) struct Runtime {
    pub phase: StorePhase,
    pub plain: Map<String, Value>,
    pub secure: BTreeMap<String, String>,
    pub decrypted: PlaintextCache<String>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            phase: StorePhase::Uninitialized,
            plain: Map::new(),
            secure: BTreeMap::new(),
            decrypted: PlaintextCache::new(),
        }
    }

    pub fn clear(&mut self) {
        self.plain.clear();
        self.secure.clear();
        self.decrypted.clear();
    }
}

pub(crate) type SharedRuntime = Arc<RwLock<Runtime>>;

pub(crate) fn shared() -> SharedRuntime {
    Arc::new(RwLock::new(Runtime::new()))
}
