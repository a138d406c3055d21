//! Change broadcast registry.
//!
//! Three namespaces (generic settings, profile preferences, API keys), each
//! mapping an observer to the set of names it watches. Observers connect
//! through [`WatchRegistry::connect`] and receive notifications on the
//! returned [`Observer`]; dropping it unregisters everything.

use crate::classify::{SettingKind, classify};
use crate::error::{SettingsError, SettingsResult};
use haven_types::ObserverId;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::debug;

/// A setting change pushed to watching observers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub key: String,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

/// Watch namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Generic,
    Preferences,
    ApiKeys,
}

/// Namespace and watched name for a classified key. API keys are watched
/// by type so every spelling of the same key matches.
fn watch_slot(kind: SettingKind, key: &str) -> (Namespace, String) {
    match kind {
        SettingKind::Preference => (Namespace::Preferences, key.to_string()),
        SettingKind::ApiKey(t) => (Namespace::ApiKeys, t.as_str().to_string()),
        SettingKind::Generic => (Namespace::Generic, key.to_string()),
    }
}

#[derive(Default)]
struct Registry {
    senders: HashMap<ObserverId, mpsc::UnboundedSender<ChangeNotification>>,
    watches: HashMap<Namespace, HashMap<ObserverId, HashSet<String>>>,
}

impl Registry {
    fn forget(&mut self, id: ObserverId) {
        self.senders.remove(&id);
        for observers in self.watches.values_mut() {
            observers.remove(&id);
        }
        self.watches.retain(|_, observers| !observers.is_empty());
    }
}

/// Tracks which observers watch which keys.
#[derive(Default)]
pub struct WatchRegistry {
    inner: Mutex<Registry>,
}

impl WatchRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connects a new observer. Its registrations live as long as the
    /// returned handle.
    pub fn connect(self: &Arc<Self>) -> Observer {
        let id = ObserverId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().senders.insert(id, tx);
        debug!(observer = %id, "Observer connected");
        Observer {
            id,
            registry: Arc::downgrade(self),
            receiver: rx,
        }
    }

    /// Adds keys to an observer's watch sets. Re-watching is a no-op.
    ///
    /// All keys are classified before anything is registered.
    pub fn watch(&self, id: ObserverId, keys: &[&str]) -> SettingsResult<()> {
        let slots = keys
            .iter()
            .map(|key| classify(key).map(|kind| watch_slot(kind, key)))
            .collect::<SettingsResult<Vec<_>>>()?;

        let mut reg = self.inner.lock();
        if !reg.senders.contains_key(&id) {
            return Err(SettingsError::UnknownObserver(id));
        }
        for (namespace, name) in slots {
            reg.watches
                .entry(namespace)
                .or_default()
                .entry(id)
                .or_default()
                .insert(name);
        }
        Ok(())
    }

    /// Removes the given keys, or every registration when `keys` is `None`.
    /// Never fails; unknown keys and observers are ignored.
    pub fn unwatch(&self, id: ObserverId, keys: Option<&[&str]>) {
        let mut reg = self.inner.lock();
        match keys {
            None => {
                for observers in reg.watches.values_mut() {
                    observers.remove(&id);
                }
            }
            Some(keys) => {
                for key in keys {
                    let Ok(kind) = classify(key) else { continue };
                    let (namespace, name) = watch_slot(kind, key);
                    if let Some(set) = reg
                        .watches
                        .get_mut(&namespace)
                        .and_then(|observers| observers.get_mut(&id))
                    {
                        set.remove(&name);
                    }
                }
            }
        }
        for observers in reg.watches.values_mut() {
            observers.retain(|_, set| !set.is_empty());
        }
        reg.watches.retain(|_, observers| !observers.is_empty());
    }

    /// Notifies every observer watching `key`. Observers whose receiver is
    /// gone are skipped and dropped. Returns the number notified.
    pub fn broadcast(
        &self,
        kind: SettingKind,
        key: &str,
        new_value: Option<Value>,
        old_value: Option<Value>,
    ) -> usize {
        let (namespace, name) = watch_slot(kind, key);
        let notification = ChangeNotification {
            key: key.to_string(),
            new_value,
            old_value,
        };

        let mut reg = self.inner.lock();
        let targets: Vec<ObserverId> = reg
            .watches
            .get(&namespace)
            .map(|observers| {
                observers
                    .iter()
                    .filter(|(_, set)| set.contains(&name))
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default();

        let mut delivered = 0;
        let mut gone = Vec::new();
        for id in targets {
            match reg.senders.get(&id) {
                Some(tx) if tx.send(notification.clone()).is_ok() => delivered += 1,
                _ => gone.push(id),
            }
        }
        for id in gone {
            debug!(observer = %id, "Skipping disconnected observer");
            reg.forget(id);
        }
        delivered
    }

    /// Names an observer watches in a namespace, sorted.
    pub fn watched(&self, id: ObserverId, namespace: Namespace) -> Vec<String> {
        let reg = self.inner.lock();
        let mut names: Vec<String> = reg
            .watches
            .get(&namespace)
            .and_then(|observers| observers.get(&id))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Whether the namespace holds any entry for this observer.
    pub fn has_entry(&self, id: ObserverId, namespace: Namespace) -> bool {
        self.inner
            .lock()
            .watches
            .get(&namespace)
            .is_some_and(|observers| observers.contains_key(&id))
    }

    /// Connected observers.
    pub fn observer_count(&self) -> usize {
        self.inner.lock().senders.len()
    }

    fn disconnect(&self, id: ObserverId) {
        self.inner.lock().forget(id);
        debug!(observer = %id, "Observer disconnected");
    }
}

/// A connected observer. Dropping it removes all of its registrations.
pub struct Observer {
    id: ObserverId,
    registry: Weak<WatchRegistry>,
    receiver: mpsc::UnboundedReceiver<ChangeNotification>,
}

impl Observer {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn watch(&self, keys: &[&str]) -> SettingsResult<()> {
        match self.registry.upgrade() {
            Some(registry) => registry.watch(self.id, keys),
            None => Err(SettingsError::UnknownObserver(self.id)),
        }
    }

    pub fn unwatch(&self, keys: Option<&[&str]>) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unwatch(self.id, keys);
        }
    }

    /// Waits for the next notification.
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        self.receiver.recv().await
    }

    /// Returns a pending notification without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeNotification> {
        self.receiver.try_recv().ok()
    }

    /// Stops receiving while keeping the handle. The registry drops this
    /// observer the next time a broadcast reaches it.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.disconnect(self.id);
        }
    }
}
