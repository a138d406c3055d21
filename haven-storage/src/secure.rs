//! Secure settings and imported data.
//!
//! Values are encrypted before the state lock is taken and stored as
//! ciphertext in the profile document. Plaintext is cached in memory on
//! first read through [`haven_vault::PlaintextCache`]; a value that no
//! longer decrypts reads as absent. Every change is published redacted.

use crate::error::{StorageError, StorageResult};
use crate::import::{ImportBatch, ImportKind};
use crate::store::{ProfileState, ProfileStore, Save, secure_change};
use crate::validation::{validate_batch, validate_source};
use haven_crypto::StringEncryptor;
use haven_types::ProfileId;
use tracing::{debug, info, warn};

impl ProfileState {
    /// Plaintext of one secure setting, via the cache.
    pub(crate) fn reveal(
        &mut self,
        encryptor: &dyn StringEncryptor,
        profile: ProfileId,
        key: &str,
    ) -> StorageResult<Option<String>> {
        let stored = self
            .document
            .profile(profile)
            .ok_or(StorageError::ProfileNotFound(profile))?
            .secure_settings
            .get(key)
            .map(String::as_str);
        Ok(self
            .secure_cache
            .reveal(&(profile, key.to_string()), stored, encryptor))
    }

    fn keys_with_prefix(&self, profile: ProfileId, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .profile(profile)?
            .secure_settings
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

impl ProfileStore {
    // ── Secure settings ──────────────────────────────────────────

    /// Encrypts and stores a value. Fails if encryption fails; there is no
    /// cleartext fallback here.
    pub async fn set_secure_setting(
        &self,
        profile: ProfileId,
        key: &str,
        value: &str,
    ) -> StorageResult<()> {
        let ciphertext = self.inner.encryptor.encrypt(value)?;
        let (existed, active) = self
            .mutate(Save::Immediate, |state| {
                let existed = state.update_profile(profile, |p| {
                    Ok(p.secure_settings.insert(key.to_string(), ciphertext).is_some())
                })?;
                state
                    .secure_cache
                    .insert((profile, key.to_string()), value.to_string());
                Ok((existed, state.is_active(profile)))
            })
            .await?;
        debug!(profile_id = %profile, key = %key, "Secure setting stored");
        self.publish(profile, active, true, vec![secure_change(key, true, existed)]);
        Ok(())
    }

    pub async fn get_secure_setting(
        &self,
        profile: ProfileId,
        key: &str,
    ) -> StorageResult<Option<String>> {
        let mut guard = self.inner.state.write().await;
        let state = guard.as_mut().ok_or(StorageError::NotInitialized)?;
        state.reveal(self.inner.encryptor.as_ref(), profile, key)
    }

    /// Removes a value. Returns whether it existed.
    pub async fn remove_secure_setting(&self, profile: ProfileId, key: &str) -> StorageResult<bool> {
        let (existed, active) = self
            .mutate(Save::Immediate, |state| {
                state.secure_cache.remove(&(profile, key.to_string()));
                let existed = state
                    .update_profile(profile, |p| Ok(p.secure_settings.remove(key).is_some()))?;
                Ok((existed, state.is_active(profile)))
            })
            .await?;
        if existed {
            self.publish(profile, active, true, vec![secure_change(key, false, true)]);
        }
        Ok(existed)
    }

    pub async fn secure_setting_keys(&self, profile: ProfileId) -> StorageResult<Vec<String>> {
        self.read(|state| {
            Ok(state
                .profile(profile)?
                .secure_settings
                .keys()
                .cloned()
                .collect())
        })
        .await
    }

    // ── Imports ──────────────────────────────────────────────────

    /// Stores one source's batch, replacing any earlier import from it.
    /// Returns the entry count.
    pub async fn store_imported<K: ImportKind>(
        &self,
        profile: ProfileId,
        source: &str,
        entries: Vec<K::Entry>,
    ) -> StorageResult<usize> {
        validate_source(source)?;
        validate_batch(&entries)?;

        let batch = ImportBatch::new(entries);
        let count = batch.count;
        let json = serde_json::to_string(&batch)?;
        self.set_secure_setting(profile, &K::key(source), &json)
            .await?;
        info!(profile_id = %profile, kind = K::TYPE, source = %source, count, "Import stored");
        Ok(count)
    }

    /// Entries from one source, or from every source concatenated.
    pub async fn get_imported<K: ImportKind>(
        &self,
        profile: ProfileId,
        source: Option<&str>,
    ) -> StorageResult<Vec<K::Entry>> {
        let mut guard = self.inner.state.write().await;
        let state = guard.as_mut().ok_or(StorageError::NotInitialized)?;
        let encryptor = self.inner.encryptor.as_ref();

        let keys = match source {
            Some(source) => vec![K::key(source)],
            None => state.keys_with_prefix(profile, &K::prefix())?,
        };

        let mut entries = Vec::new();
        for key in keys {
            let Some(json) = state.reveal(encryptor, profile, &key)? else {
                continue;
            };
            match serde_json::from_str::<ImportBatch<K::Entry>>(&json) {
                Ok(batch) => entries.extend(batch.entries),
                Err(e) => warn!(key = %key, error = %e, "Skipping malformed import batch"),
            }
        }
        Ok(entries)
    }

    /// Removes one source's import. Returns whether it existed.
    pub async fn remove_imported<K: ImportKind>(
        &self,
        profile: ProfileId,
        source: &str,
    ) -> StorageResult<bool> {
        validate_source(source)?;
        self.remove_secure_setting(profile, &K::key(source)).await
    }

    /// Removes every import of this kind. Returns how many sources were
    /// removed.
    pub async fn clear_imported<K: ImportKind>(&self, profile: ProfileId) -> StorageResult<usize> {
        let prefix = K::prefix();
        let (removed, active) = self
            .mutate(Save::Immediate, |state| {
                state
                    .secure_cache
                    .retain(|(owner, key)| *owner != profile || !key.starts_with(&prefix));
                let removed = state.update_profile(profile, |p| {
                    let removed: Vec<String> = p
                        .secure_settings
                        .keys()
                        .filter(|key| key.starts_with(&prefix))
                        .cloned()
                        .collect();
                    for key in &removed {
                        p.secure_settings.remove(key);
                    }
                    Ok(removed)
                })?;
                Ok((removed, state.is_active(profile)))
            })
            .await?;
        let count = removed.len();
        let changes = removed
            .iter()
            .map(|key| secure_change(key, false, true))
            .collect();
        self.publish(profile, active, true, changes);
        Ok(count)
    }

    /// Sources with an import of this kind.
    pub async fn import_sources<K: ImportKind>(
        &self,
        profile: ProfileId,
    ) -> StorageResult<Vec<String>> {
        let prefix = K::prefix();
        self.read(|state| {
            Ok(state
                .keys_with_prefix(profile, &prefix)?
                .into_iter()
                .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
                .collect())
        })
        .await
    }
}
