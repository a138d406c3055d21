//! Memory-only plaintext cache over individually encrypted values.
//!
//! Shared by the desktop store's secure cells and the profile store's
//! secure settings: the first read decrypts, later reads hit the cache, and
//! a value that no longer decrypts reads as absent.

use haven_crypto::StringEncryptor;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::warn;

/// Marker for values stored without encryption after an encrypt failure.
pub const CLEARTEXT_PREFIX: &str = "cleartext:";

/// Decrypted values keyed by `K`. Never persisted.
#[derive(Debug)]
pub struct PlaintextCache<K> {
    entries: HashMap<K, String>,
}

impl<K: Eq + Hash + Clone + Debug> PlaintextCache<K> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Plaintext for `key`, decrypting `stored` on a cache miss.
    ///
    /// `stored` is the persisted form: ciphertext, or a
    /// [`CLEARTEXT_PREFIX`]ed value left by a failed encrypt.
    pub fn reveal(
        &mut self,
        key: &K,
        stored: Option<&str>,
        encryptor: &dyn StringEncryptor,
    ) -> Option<String> {
        if let Some(plain) = self.entries.get(key) {
            return Some(plain.clone());
        }
        let stored = stored?;

        let plain = if let Some(cleartext) = stored.strip_prefix(CLEARTEXT_PREFIX) {
            warn!(key = ?key, "Secure value is stored in cleartext");
            cleartext.to_string()
        } else {
            match encryptor.decrypt(stored) {
                Ok(plain) => plain,
                Err(e) => {
                    warn!(key = ?key, error = %e, "Secure value unreadable, treating as absent");
                    return None;
                }
            }
        };

        self.entries.insert(key.clone(), plain.clone());
        Some(plain)
    }

    pub fn insert(&mut self, key: K, plain: String) {
        self.entries.insert(key, plain);
    }

    pub fn remove(&mut self, key: &K) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Clone + Debug> Default for PlaintextCache<K> {
    fn default() -> Self {
        Self::new()
    }
}
