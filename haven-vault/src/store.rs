//! Desktop store facade: one entry point over plain and secure runtime keys.

use crate::backend::KvBackend;
use crate::cell::SecureCellStore;
use crate::classify::is_secure_key;
use crate::error::VaultResult;
use crate::events::{ChangeFeed, ChangeSink, StoreChange};
use crate::lifecycle::BlobLifecycle;
use crate::runtime::{self, SharedRuntime};
use haven_crypto::StringEncryptor;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Runtime key/value store routed by [`is_secure_key`].
pub struct DesktopStore {
    runtime: SharedRuntime,
    cells: SecureCellStore,
    lifecycle: BlobLifecycle,
    events: ChangeFeed<StoreChange>,
}

impl DesktopStore {
    /// Creates the store over a backend. Call
    /// [`BlobLifecycle::initialize_store`] before use.
    pub fn new(backend: Arc<dyn KvBackend>, encryptor: Arc<dyn StringEncryptor>) -> Self {
        let runtime = runtime::shared();
        let events = ChangeFeed::new();
        Self {
            cells: SecureCellStore::new(runtime.clone(), encryptor.clone(), events.clone()),
            lifecycle: BlobLifecycle::new(backend, encryptor, runtime.clone()),
            runtime,
            events,
        }
    }

    /// The blob lifecycle manager.
    pub fn lifecycle(&self) -> &BlobLifecycle {
        &self.lifecycle
    }

    /// The secure cell view.
    pub fn cells(&self) -> &SecureCellStore {
        &self.cells
    }

    /// Attaches a sink that sees every later write, plain or secure.
    /// Secure values arrive redacted.
    pub fn attach(&self, sink: Arc<dyn ChangeSink<StoreChange>>) {
        self.events.attach(sink);
    }

    /// Reads a key. Secure values are JSON-decoded from their plaintext.
    pub fn get(&self, key: &str) -> VaultResult<Option<Value>> {
        if is_secure_key(key) {
            return Ok(self.cells.get(key)?.map(decode_secure));
        }
        let rt = self.runtime.read();
        rt.phase.ensure_open()?;
        Ok(rt.plain.get(key).cloned())
    }

    /// Writes a key.
    pub fn set(&self, key: &str, value: Value) -> VaultResult<()> {
        if is_secure_key(key) {
            return self.cells.set(key, &serde_json::to_string(&value)?);
        }
        let old = {
            let mut rt = self.runtime.write();
            rt.phase.ensure_open()?;
            rt.plain.insert(key.to_string(), value.clone())
        };
        self.events.emit(&StoreChange {
            key: key.to_string(),
            new_value: Some(value),
            old_value: old,
        });
        Ok(())
    }

    /// Deletes a key.
    pub fn delete(&self, key: &str) -> VaultResult<()> {
        if is_secure_key(key) {
            return self.cells.delete(key);
        }
        let old = {
            let mut rt = self.runtime.write();
            rt.phase.ensure_open()?;
            rt.plain.remove(key)
        };
        if old.is_some() {
            self.events.emit(&StoreChange {
                key: key.to_string(),
                new_value: None,
                old_value: old,
            });
        }
        Ok(())
    }

    /// Lists plain and secure keys.
    pub fn keys(&self) -> VaultResult<Vec<String>> {
        let rt = self.runtime.read();
        rt.phase.ensure_open()?;
        Ok(rt.plain.keys().chain(rt.secure.keys()).cloned().collect())
    }
}

fn decode_secure(plain: String) -> Value {
    serde_json::from_str(&plain).unwrap_or_else(|e| {
        warn!(error = %e, "Secure value is not JSON, returning it as a string");
        Value::String(plain)
    })
}
