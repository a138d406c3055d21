//! Per-key secure cells.
//!
//! Each value is encrypted on its own and kept as ciphertext in the
//! runtime map; the first read decrypts it into an in-memory cache.

use crate::cache::CLEARTEXT_PREFIX;
use crate::error::VaultResult;
use crate::events::{ChangeFeed, StoreChange, redacted};
use crate::runtime::SharedRuntime;
use haven_crypto::StringEncryptor;
use std::sync::Arc;
use tracing::error;

/// Secure view over the runtime store.
#[derive(Clone)]
pub struct SecureCellStore {
    runtime: SharedRuntime,
    encryptor: Arc<dyn StringEncryptor>,
    events: ChangeFeed<StoreChange>,
}

impl SecureCellStore {
    pub(crate) fn new(
        runtime: SharedRuntime,
        encryptor: Arc<dyn StringEncryptor>,
        events: ChangeFeed<StoreChange>,
    ) -> Self {
        Self {
            runtime,
            encryptor,
            events,
        }
    }

    /// Reads a secure value.
    ///
    /// Returns `Ok(None)` for keys never set and for values that can no
    /// longer be decrypted.
    pub fn get(&self, key: &str) -> VaultResult<Option<String>> {
        let mut guard = self.runtime.write();
        guard.phase.ensure_open()?;
        let rt = &mut *guard;
        let stored = rt.secure.get(key).map(String::as_str);
        Ok(rt
            .decrypted
            .reveal(&key.to_string(), stored, self.encryptor.as_ref()))
    }

    /// Encrypts and stores a value, then emits a redacted change event.
    ///
    /// If encryption fails the value is kept in cleartext so it is not
    /// lost; that degradation is logged at error level every time.
    pub fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        let stored = match self.encryptor.encrypt(value) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                error!(
                    key = %key,
                    error = %e,
                    "ENCRYPTION FAILED: storing secure value in CLEARTEXT"
                );
                format!("{CLEARTEXT_PREFIX}{value}")
            }
        };

        let existed = {
            let mut rt = self.runtime.write();
            rt.phase.ensure_open()?;
            rt.decrypted.insert(key.to_string(), value.to_string());
            rt.secure.insert(key.to_string(), stored).is_some()
        };

        self.emit(key, true, existed);
        Ok(())
    }

    /// Removes a value from the cache and the runtime map.
    pub fn delete(&self, key: &str) -> VaultResult<()> {
        let existed = {
            let mut rt = self.runtime.write();
            rt.phase.ensure_open()?;
            rt.decrypted.remove(&key.to_string());
            rt.secure.remove(key).is_some()
        };

        if existed {
            self.emit(key, false, true);
        }
        Ok(())
    }

    /// Lists secure keys currently present.
    pub fn keys(&self) -> VaultResult<Vec<String>> {
        let rt = self.runtime.read();
        rt.phase.ensure_open()?;
        Ok(rt.secure.keys().cloned().collect())
    }

    fn emit(&self, key: &str, present: bool, was_present: bool) {
        self.events.emit(&StoreChange {
            key: key.to_string(),
            new_value: present.then(redacted),
            old_value: was_present.then(redacted),
        });
    }
}
