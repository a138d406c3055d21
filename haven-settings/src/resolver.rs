//! Settings resolution.
//!
//! One entry point for reads and writes. Each key is classified once and
//! routed to profile preferences, the active profile's encrypted API keys,
//! or the generic app settings held in the desktop store.
//!
//! Notifications do not come from the resolver itself. Both stores publish
//! every write, whoever made it, and a [`WatchForwarder`] attached at
//! construction turns those events into watch-registry broadcasts. Secret
//! values arrive already redacted.

use crate::classify::{ApiKeyType, PREFERENCE_KEYS, SettingKind, classify};
use crate::env::EnvSource;
use crate::error::{SettingsError, SettingsResult};
use crate::watch::WatchRegistry;
use haven_storage::{ProfileSettingChange, ProfileStore};
use haven_types::ProfileId;
use haven_vault::{ChangeSink, DesktopStore, StoreChange, is_secure_key, redacted};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Routes store change events into a [`WatchRegistry`].
///
/// App-store events reach the generic namespace. Profile events reach the
/// preference and API-key namespaces, and only for the active profile.
pub struct WatchForwarder {
    watchers: Weak<WatchRegistry>,
}

impl WatchForwarder {
    pub fn new(watchers: &Arc<WatchRegistry>) -> Arc<Self> {
        Arc::new(Self {
            watchers: Arc::downgrade(watchers),
        })
    }

    fn deliver(&self, kind: SettingKind, key: &str, change: &StoreChange) {
        if let Some(watchers) = self.watchers.upgrade() {
            watchers.broadcast(
                kind,
                key,
                change.new_value.clone(),
                change.old_value.clone(),
            );
        }
    }
}

impl ChangeSink<StoreChange> for WatchForwarder {
    fn on_change(&self, event: &StoreChange) {
        // Preference and API-key names are never served from the app store.
        if let Ok(SettingKind::Generic) = classify(&event.key) {
            self.deliver(SettingKind::Generic, &event.key, event);
        }
    }
}

impl ChangeSink<ProfileSettingChange> for WatchForwarder {
    fn on_change(&self, event: &ProfileSettingChange) {
        if !event.active {
            return;
        }
        let change = &event.change;
        if event.secure {
            if let Some(t) = ApiKeyType::from_secure_key(&change.key) {
                self.deliver(SettingKind::ApiKey(t), &t.setting_key(), change);
            }
        } else if let Ok(SettingKind::Preference) = classify(&change.key) {
            self.deliver(SettingKind::Preference, &change.key, change);
        }
    }
}

pub struct SettingsResolver {
    app: Arc<DesktopStore>,
    profiles: ProfileStore,
    env: Arc<dyn EnvSource>,
    watchers: Arc<WatchRegistry>,
    /// Types already migrated from the environment in this process.
    migrated: Mutex<HashSet<ApiKeyType>>,
}

impl SettingsResolver {
    pub fn new(
        app: Arc<DesktopStore>,
        profiles: ProfileStore,
        env: Arc<dyn EnvSource>,
        watchers: Arc<WatchRegistry>,
    ) -> Self {
        let forwarder = WatchForwarder::new(&watchers);
        app.attach(forwarder.clone());
        profiles.attach(forwarder);
        Self {
            app,
            profiles,
            env,
            watchers,
            migrated: Mutex::new(HashSet::new()),
        }
    }

    pub fn watchers(&self) -> &Arc<WatchRegistry> {
        &self.watchers
    }

    // ── Reads ────────────────────────────────────────────────────

    pub async fn get_setting(&self, key: &str) -> SettingsResult<Option<Value>> {
        match classify(key)? {
            SettingKind::Preference => {
                let Some(profile) = self.profiles.active_profile_id().await? else {
                    return Ok(None);
                };
                Ok(self.profiles.get_profile_setting(profile, key).await?)
            }
            SettingKind::ApiKey(t) => Ok(self.resolve_api_key(t).await?.map(Value::String)),
            SettingKind::Generic => Ok(self.app.get(key)?),
        }
    }

    /// Stored key for the active profile, else the mapped environment
    /// variable. An environment hit is written to secure storage the first
    /// time it is seen in this process.
    async fn resolve_api_key(&self, t: ApiKeyType) -> SettingsResult<Option<String>> {
        let profile = self.profiles.active_profile_id().await?;
        if let Some(profile) = profile {
            let stored = self
                .profiles
                .get_secure_setting(profile, &t.secure_key())
                .await?;
            if let Some(value) = stored.filter(|v| !v.is_empty()) {
                return Ok(Some(value));
            }
        }

        let Some((var, value)) = t
            .env_vars()
            .iter()
            .find_map(|var| self.env.get(var).map(|value| (*var, value)))
        else {
            return Ok(None);
        };

        if let Some(profile) = profile {
            self.migrate_once(profile, t, var, &value).await;
        }
        Ok(Some(value))
    }

    async fn migrate_once(&self, profile: ProfileId, t: ApiKeyType, var: &str, value: &str) {
        if !self.migrated.lock().insert(t) {
            return;
        }
        match self
            .profiles
            .set_secure_setting(profile, &t.secure_key(), value)
            .await
        {
            Ok(()) => info!(key_type = %t, env_var = var, "Migrated API key from environment"),
            Err(e) => warn!(key_type = %t, error = %e, "API key migration failed"),
        }
    }

    /// Every generic setting, the active profile's preferences and every
    /// resolvable API key. With `masked`, secret values are replaced by
    /// [`haven_vault::REDACTED_MARKER`]; the keys stay.
    pub async fn get_all_settings(&self, masked: bool) -> SettingsResult<Map<String, Value>> {
        let mut all = Map::new();

        for key in self.app.keys()? {
            let Some(value) = self.app.get(&key)? else {
                continue;
            };
            let value = if masked && is_secure_key(&key) {
                redacted()
            } else {
                value
            };
            all.insert(key, value);
        }

        if let Some(profile) = self.profiles.active_profile_id().await? {
            let settings = self.profiles.get_profile_settings(profile).await?;
            for key in PREFERENCE_KEYS {
                if let Some(value) = settings.get(key) {
                    all.insert(key.to_string(), value.clone());
                }
            }
        }

        for t in ApiKeyType::ALL {
            if let Some(value) = self.resolve_api_key(t).await? {
                let value = if masked {
                    redacted()
                } else {
                    Value::String(value)
                };
                all.insert(t.setting_key(), value);
            }
        }
        Ok(all)
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Writes a setting. `null` (and, for API keys, an empty string) is a
    /// removal. Watchers hear about it through the store's change feed.
    pub async fn set_setting(&self, key: &str, value: Value) -> SettingsResult<()> {
        let kind = classify(key)?;
        if value.is_null() {
            return self.remove_setting(key).await;
        }

        match kind {
            SettingKind::Preference => {
                let profile = self.require_profile().await?;
                self.profiles
                    .set_profile_setting(profile, key, value)
                    .await?;
            }
            SettingKind::ApiKey(t) => {
                let secret = match value {
                    Value::String(s) if s.trim().is_empty() => {
                        return self.remove_setting(key).await;
                    }
                    Value::String(s) => s,
                    _ => {
                        return Err(SettingsError::InvalidValue {
                            key: key.to_string(),
                            reason: "API keys must be strings".into(),
                        });
                    }
                };
                let profile = self.require_profile().await?;
                self.profiles
                    .set_secure_setting(profile, &t.secure_key(), &secret)
                    .await?;
                debug!(key_type = %t, "API key stored");
            }
            SettingKind::Generic => self.app.set(key, value)?,
        }
        Ok(())
    }

    /// Removes a setting. API-key removal also drops the mapped variables
    /// from the environment snapshot so the key does not come back.
    pub async fn remove_setting(&self, key: &str) -> SettingsResult<()> {
        match classify(key)? {
            SettingKind::Preference => {
                if let Some(profile) = self.profiles.active_profile_id().await? {
                    self.profiles.remove_profile_setting(profile, key).await?;
                }
            }
            SettingKind::ApiKey(t) => {
                for var in t.env_vars() {
                    self.env.remove(var);
                }
                if let Some(profile) = self.profiles.active_profile_id().await? {
                    self.profiles
                        .remove_secure_setting(profile, &t.secure_key())
                        .await?;
                }
            }
            SettingKind::Generic => self.app.delete(key)?,
        }
        Ok(())
    }

    async fn require_profile(&self) -> SettingsResult<ProfileId> {
        self.profiles
            .active_profile_id()
            .await?
            .ok_or(SettingsError::NoActiveProfile)
    }
}
