//! The profile store: state, initialization, persistence and profile CRUD.
//!
//! State lives behind one async `RwLock`. Every mutation goes through
//! [`ProfileStore::mutate`], which edits a draft copy of the affected
//! profile and swaps it in only on success, then schedules a save.
//! Saves write the whole document atomically; navigation writes are
//! debounced, everything else is written right away in the background.
//! Settings changes are published to attached sinks after the lock is
//! released.

use crate::error::{StorageError, StorageResult};
use crate::model::{Profile, ProfileDocument, ProfileSettings, ProfileSummary};
use crate::session::SessionProvider;
use crate::validation::{ValidationError, validate_text};
use chrono::Utc;
use haven_crypto::StringEncryptor;
use haven_types::ProfileId;
use haven_vault::{
    ChangeFeed, ChangeSink, PlaintextCache, StoreChange, redacted, write_private_file,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, error, info, warn};

/// Profile document file name inside the data directory.
pub const PROFILES_FILE: &str = "profiles.json";

/// Quiet period before a debounced save is written.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Name given to the profile created on first launch.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Profile store settings.
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    pub data_dir: PathBuf,
    pub debounce: Duration,
}

impl ProfileStoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            debounce: DEFAULT_SAVE_DEBOUNCE,
        }
    }
}

/// Fired by the host once platform paths may be touched.
#[derive(Debug, Clone, Default)]
pub struct StartupSignal(Arc<AtomicBool>);

impl StartupSignal {
    /// A signal that has already fired.
    pub fn fired() -> Self {
        let signal = Self::default();
        signal.fire();
        signal
    }

    pub fn fire(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn has_fired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A change to one profile's settings. Secure settings carry
/// [`haven_vault::REDACTED_MARKER`] instead of their values.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSettingChange {
    pub profile: ProfileId,
    /// Whether `profile` was active when the change landed.
    pub active: bool,
    pub secure: bool,
    pub change: StoreChange,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Save {
    Immediate,
    Debounced,
}

pub(crate) struct ProfileState {
    pub document: ProfileDocument,
    /// Decrypted secure settings. Memory only.
    pub secure_cache: PlaintextCache<(ProfileId, String)>,
}

impl ProfileState {
    pub fn profile(&self, id: ProfileId) -> StorageResult<&Profile> {
        self.document
            .profile(id)
            .ok_or(StorageError::ProfileNotFound(id))
    }

    pub fn is_active(&self, id: ProfileId) -> bool {
        self.document.active_profile_id == Some(id)
    }

    /// Copy-on-write update of one profile. The draft replaces the stored
    /// profile only if `f` succeeds.
    pub fn update_profile<R>(
        &mut self,
        id: ProfileId,
        f: impl FnOnce(&mut Profile) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let idx = self
            .document
            .position(id)
            .ok_or(StorageError::ProfileNotFound(id))?;
        let mut draft = self.document.profiles[idx].clone();
        let out = f(&mut draft)?;
        self.document.profiles[idx] = draft;
        Ok(out)
    }
}

pub(crate) struct Inner {
    pub path: PathBuf,
    pub debounce: Duration,
    pub encryptor: Arc<dyn StringEncryptor>,
    pub sessions: Arc<dyn SessionProvider>,
    events: ChangeFeed<ProfileSettingChange>,
    startup: StartupSignal,
    init: OnceCell<()>,
    pub state: RwLock<Option<ProfileState>>,
    save_generation: AtomicU64,
    write_lock: Mutex<()>,
}

impl Inner {
    async fn persist(&self) -> StorageResult<()> {
        let _writer = self.write_lock.lock().await;
        let bytes = {
            let guard = self.state.read().await;
            let Some(state) = guard.as_ref() else {
                return Ok(());
            };
            serde_json::to_vec_pretty(&state.document)?
        };
        write_private_file(&self.path, &bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Profiles saved");
        Ok(())
    }

    async fn persist_logged(&self) {
        if let Err(e) = self.persist().await {
            error!(error = %e, "Failed to save profiles");
        }
    }
}

/// Multi-profile store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProfileStore {
    pub(crate) inner: Arc<Inner>,
}

impl ProfileStore {
    pub fn new(
        config: ProfileStoreConfig,
        encryptor: Arc<dyn StringEncryptor>,
        sessions: Arc<dyn SessionProvider>,
        startup: StartupSignal,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: config.data_dir.join(PROFILES_FILE),
                debounce: config.debounce,
                encryptor,
                sessions,
                events: ChangeFeed::new(),
                startup,
                init: OnceCell::new(),
                state: RwLock::new(None),
                save_generation: AtomicU64::new(0),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Attaches a sink that sees every later settings change, plain or
    /// secure, on any profile.
    pub fn attach(&self, sink: Arc<dyn ChangeSink<ProfileSettingChange>>) {
        self.inner.events.attach(sink);
    }

    pub(crate) fn publish(
        &self,
        profile: ProfileId,
        active: bool,
        secure: bool,
        changes: Vec<StoreChange>,
    ) {
        for change in changes {
            self.inner.events.emit(&ProfileSettingChange {
                profile,
                active,
                secure,
                change,
            });
        }
    }

    /// Path of the profile document.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    // ── Initialization ───────────────────────────────────────────

    /// Loads the profile document, creating sessions for every profile.
    ///
    /// Concurrent callers share one load. Calling this before the host's
    /// startup signal is a programming error and fails with
    /// [`StorageError::AppNotReady`].
    pub async fn initialize(&self) -> StorageResult<()> {
        if !self.inner.startup.has_fired() {
            error!("Profile store initialized before application startup");
            return Err(StorageError::AppNotReady);
        }
        self.inner.init.get_or_try_init(|| self.load()).await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.init.initialized()
    }

    async fn load(&self) -> StorageResult<()> {
        let mut document = read_document(&self.inner.path)?;

        for profile in &document.profiles {
            if let Err(e) = self.inner.sessions.create(profile.id) {
                warn!(profile_id = %profile.id, error = %e, "Failed to create session");
            }
        }

        let mut created_default = false;
        if document.profiles.is_empty() {
            let profile = Profile::new(DEFAULT_PROFILE_NAME);
            self.inner.sessions.create(profile.id)?;
            document.active_profile_id = Some(profile.id);
            document.profiles.push(profile);
            created_default = true;
        }

        let active_valid = document
            .active_profile_id
            .is_some_and(|id| document.profile(id).is_some());
        if !active_valid {
            document.active_profile_id = most_recent(&document.profiles);
        }

        info!(profiles = document.profiles.len(), "Profile store loaded");
        *self.inner.state.write().await = Some(ProfileState {
            document,
            secure_cache: PlaintextCache::new(),
        });

        if created_default {
            self.schedule_save(Save::Immediate);
        }
        Ok(())
    }

    // ── State access ─────────────────────────────────────────────

    pub(crate) async fn read<R>(
        &self,
        f: impl FnOnce(&ProfileState) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let guard = self.inner.state.read().await;
        let state = guard.as_ref().ok_or(StorageError::NotInitialized)?;
        f(state)
    }

    /// Applies `f` and schedules a save if it succeeds.
    pub(crate) async fn mutate<R>(
        &self,
        save: Save,
        f: impl FnOnce(&mut ProfileState) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let out = {
            let mut guard = self.inner.state.write().await;
            let state = guard.as_mut().ok_or(StorageError::NotInitialized)?;
            f(state)?
        };
        self.schedule_save(save);
        Ok(out)
    }

    // ── Persistence ──────────────────────────────────────────────

    fn schedule_save(&self, save: Save) {
        let inner = Arc::clone(&self.inner);
        // Any newer save supersedes pending debounced ones.
        let generation = inner.save_generation.fetch_add(1, Ordering::SeqCst) + 1;
        match save {
            Save::Immediate => {
                tokio::spawn(async move { inner.persist_logged().await });
            }
            Save::Debounced => {
                tokio::spawn(async move {
                    tokio::time::sleep(inner.debounce).await;
                    if inner.save_generation.load(Ordering::SeqCst) == generation {
                        inner.persist_logged().await;
                    }
                });
            }
        }
    }

    /// Writes the document now, cancelling any pending debounced save.
    pub async fn flush(&self) -> StorageResult<()> {
        self.inner.save_generation.fetch_add(1, Ordering::SeqCst);
        self.inner.persist().await
    }

    // ── Profiles ─────────────────────────────────────────────────

    /// Creates a profile with its own session and makes it active.
    ///
    /// The write is queued, not awaited; call [`flush`](Self::flush) for
    /// durability.
    pub async fn create_profile(&self, name: &str) -> StorageResult<ProfileId> {
        validate_name(name)?;
        let sessions = Arc::clone(&self.inner.sessions);
        let id = self
            .mutate(Save::Immediate, |state| {
                let profile = Profile::new(name.trim());
                sessions.create(profile.id)?;
                let id = profile.id;
                state.document.profiles.push(profile);
                state.document.active_profile_id = Some(id);
                Ok(id)
            })
            .await?;
        info!(profile_id = %id, "Profile created");
        Ok(id)
    }

    pub async fn list_profiles(&self) -> StorageResult<Vec<ProfileSummary>> {
        self.read(|state| {
            let active = state.document.active_profile_id;
            Ok(state
                .document
                .profiles
                .iter()
                .map(|p| ProfileSummary {
                    id: p.id,
                    name: p.name.clone(),
                    created_at: p.created_at,
                    last_active: p.last_active,
                    is_active: Some(p.id) == active,
                })
                .collect())
        })
        .await
    }

    pub async fn get_profile(&self, id: ProfileId) -> StorageResult<Profile> {
        self.read(|state| state.profile(id).cloned()).await
    }

    pub async fn active_profile_id(&self) -> StorageResult<Option<ProfileId>> {
        self.read(|state| Ok(state.document.active_profile_id)).await
    }

    pub async fn get_active_profile(&self) -> StorageResult<Option<Profile>> {
        self.read(|state| {
            Ok(state
                .document
                .active_profile_id
                .and_then(|id| state.document.profile(id).cloned()))
        })
        .await
    }

    pub async fn set_active_profile(&self, id: ProfileId) -> StorageResult<()> {
        self.mutate(Save::Immediate, |state| {
            state.update_profile(id, |p| {
                p.last_active = Utc::now();
                Ok(())
            })?;
            state.document.active_profile_id = Some(id);
            Ok(())
        })
        .await?;
        info!(profile_id = %id, "Active profile changed");
        Ok(())
    }

    pub async fn rename_profile(&self, id: ProfileId, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        self.mutate(Save::Immediate, |state| {
            state.update_profile(id, |p| {
                p.name = name.trim().to_string();
                Ok(())
            })
        })
        .await
    }

    /// Deletes a profile and destroys its session.
    ///
    /// If it was active, activation moves to the most recently active
    /// remaining profile, or to none. Returns the active profile after the
    /// delete.
    pub async fn delete_profile(&self, id: ProfileId) -> StorageResult<Option<ProfileId>> {
        let sessions = Arc::clone(&self.inner.sessions);
        let active = self
            .mutate(Save::Immediate, |state| {
                let idx = state
                    .document
                    .position(id)
                    .ok_or(StorageError::ProfileNotFound(id))?;
                state.document.profiles.remove(idx);
                state.secure_cache.retain(|(owner, _)| *owner != id);
                if state.document.active_profile_id == Some(id) {
                    state.document.active_profile_id = most_recent(&state.document.profiles);
                }
                Ok(state.document.active_profile_id)
            })
            .await?;

        if let Err(e) = sessions.destroy(id) {
            warn!(profile_id = %id, error = %e, "Failed to clear session storage");
        }
        info!(profile_id = %id, "Profile deleted");
        Ok(active)
    }

    // ── Profile settings ─────────────────────────────────────────

    pub async fn get_profile_settings(&self, id: ProfileId) -> StorageResult<ProfileSettings> {
        self.read(|state| Ok(state.profile(id)?.settings.clone()))
            .await
    }

    /// Merges `patch` into the profile's settings; `null` removes a key.
    /// Publishes one change per key whose value actually changed.
    pub async fn update_profile_settings(
        &self,
        id: ProfileId,
        patch: Map<String, Value>,
    ) -> StorageResult<ProfileSettings> {
        let (settings, active, changes) = self
            .mutate(Save::Immediate, |state| {
                let active = state.is_active(id);
                state.update_profile(id, |p| {
                    let before: Vec<(String, Option<Value>)> = patch
                        .keys()
                        .map(|key| (key.clone(), p.settings.get(key).cloned()))
                        .collect();
                    p.settings.apply_patch(patch);
                    let changes = before
                        .into_iter()
                        .filter_map(|(key, old_value)| {
                            let new_value = p.settings.get(&key).cloned();
                            (new_value != old_value).then_some(StoreChange {
                                key,
                                new_value,
                                old_value,
                            })
                        })
                        .collect::<Vec<_>>();
                    Ok((p.settings.clone(), active, changes))
                })
            })
            .await?;
        self.publish(id, active, false, changes);
        Ok(settings)
    }

    pub async fn get_profile_setting(
        &self,
        id: ProfileId,
        key: &str,
    ) -> StorageResult<Option<Value>> {
        self.read(|state| Ok(state.profile(id)?.settings.get(key).cloned()))
            .await
    }

    /// Sets one setting, returning the previous value.
    pub async fn set_profile_setting(
        &self,
        id: ProfileId,
        key: &str,
        value: Value,
    ) -> StorageResult<Option<Value>> {
        let (old, active) = self
            .mutate(Save::Immediate, |state| {
                let active = state.is_active(id);
                let old = state.update_profile(id, |p| Ok(p.settings.set(key, value.clone())))?;
                Ok((old, active))
            })
            .await?;
        self.publish(
            id,
            active,
            false,
            vec![StoreChange {
                key: key.to_string(),
                new_value: Some(value),
                old_value: old.clone(),
            }],
        );
        Ok(old)
    }

    pub async fn remove_profile_setting(
        &self,
        id: ProfileId,
        key: &str,
    ) -> StorageResult<Option<Value>> {
        let (old, active) = self
            .mutate(Save::Immediate, |state| {
                let active = state.is_active(id);
                let old = state.update_profile(id, |p| Ok(p.settings.remove(key)))?;
                Ok((old, active))
            })
            .await?;
        if old.is_some() {
            self.publish(
                id,
                active,
                false,
                vec![StoreChange {
                    key: key.to_string(),
                    new_value: None,
                    old_value: old.clone(),
                }],
            );
        }
        Ok(old)
    }
}

/// A redacted change for a secure setting.
pub(crate) fn secure_change(key: &str, present: bool, was_present: bool) -> StoreChange {
    StoreChange {
        key: key.to_string(),
        new_value: present.then(redacted),
        old_value: was_present.then(redacted),
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    validate_text("name", name)
}

fn most_recent(profiles: &[Profile]) -> Option<ProfileId> {
    profiles.iter().max_by_key(|p| p.last_active).map(|p| p.id)
}

fn read_document(path: &Path) -> StorageResult<ProfileDocument> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ProfileDocument::default());
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&bytes) {
        Ok(document) => Ok(document),
        Err(e) => {
            let aside = path.with_extension("json.corrupt");
            error!(path = %path.display(), error = %e, "Profile document unreadable, moving aside");
            std::fs::rename(path, &aside)?;
            Ok(ProfileDocument::default())
        }
    }
}
