use haven_settings::{Namespace, SettingKind, SettingsError, WatchRegistry, classify};
use haven_types::ObserverId;
use pretty_assertions::assert_eq;
use serde_json::json;

fn notify(registry: &WatchRegistry, key: &str) -> usize {
    let kind: SettingKind = classify(key).unwrap();
    registry.broadcast(kind, key, Some(json!(1)), None)
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn keys_land_in_their_namespace() {
    let registry = WatchRegistry::new();
    let observer = registry.connect();
    observer
        .watch(&["theme", "window.bounds", "OPENAI_API_KEY"])
        .unwrap();

    assert_eq!(
        registry.watched(observer.id(), Namespace::Preferences),
        vec!["theme"]
    );
    assert_eq!(
        registry.watched(observer.id(), Namespace::Generic),
        vec!["window.bounds"]
    );
    assert_eq!(
        registry.watched(observer.id(), Namespace::ApiKeys),
        vec!["openai"]
    );
}

#[test]
fn watching_twice_is_idempotent() {
    let registry = WatchRegistry::new();
    let mut observer = registry.connect();
    observer.watch(&["theme"]).unwrap();
    observer.watch(&["theme"]).unwrap();

    assert_eq!(
        registry.watched(observer.id(), Namespace::Preferences),
        vec!["theme"]
    );
    assert_eq!(notify(&registry, "theme"), 1);
    assert!(observer.try_recv().is_some());
    assert!(observer.try_recv().is_none());
}

#[test]
fn invalid_key_registers_nothing() {
    let registry = WatchRegistry::new();
    let observer = registry.connect();

    let err = observer.watch(&["theme", "stripeApiKey"]).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidKeyType(_)));
    assert!(!registry.has_entry(observer.id(), Namespace::Preferences));
}

#[test]
fn unknown_observer_is_rejected() {
    let registry = WatchRegistry::new();
    let stranger = ObserverId::new();
    assert!(matches!(
        registry.watch(stranger, &["theme"]).unwrap_err(),
        SettingsError::UnknownObserver(id) if id == stranger
    ));
}

// ── Unwatch ──────────────────────────────────────────────────────

#[test]
fn unwatching_unknown_key_is_a_no_op() {
    let registry = WatchRegistry::new();
    let observer = registry.connect();
    observer.watch(&["theme"]).unwrap();

    observer.unwatch(Some(&["language", "stripeApiKey"][..]));
    registry.unwatch(ObserverId::new(), None);

    assert_eq!(
        registry.watched(observer.id(), Namespace::Preferences),
        vec!["theme"]
    );
}

#[test]
fn emptied_sets_are_removed() {
    let registry = WatchRegistry::new();
    let observer = registry.connect();
    observer.watch(&["theme", "zoom"]).unwrap();

    observer.unwatch(Some(&["theme"][..]));
    assert!(!registry.has_entry(observer.id(), Namespace::Preferences));
    assert!(registry.has_entry(observer.id(), Namespace::Generic));
}

#[test]
fn unwatch_all_clears_every_namespace() {
    let registry = WatchRegistry::new();
    let observer = registry.connect();
    observer.watch(&["theme", "zoom", "github"]).unwrap();

    observer.unwatch(None);
    for ns in [Namespace::Generic, Namespace::Preferences, Namespace::ApiKeys] {
        assert!(!registry.has_entry(observer.id(), ns));
    }
    assert_eq!(notify(&registry, "zoom"), 0);
    // Still connected, can watch again.
    observer.watch(&["zoom"]).unwrap();
    assert_eq!(registry.observer_count(), 1);
}

// ── Delivery ─────────────────────────────────────────────────────

#[test]
fn spellings_of_one_api_key_deliver_once() {
    let registry = WatchRegistry::new();
    let mut observer = registry.connect();
    observer
        .watch(&["openaiApiKey", "OPENAI_API_KEY", "openai"])
        .unwrap();

    assert_eq!(notify(&registry, "openai-api-key"), 1);
    let change = observer.try_recv().unwrap();
    assert_eq!(change.key, "openai-api-key");
    assert!(observer.try_recv().is_none());
}

#[test]
fn only_watchers_of_the_key_are_notified() {
    let registry = WatchRegistry::new();
    let mut a = registry.connect();
    let mut b = registry.connect();
    a.watch(&["theme"]).unwrap();
    b.watch(&["language"]).unwrap();

    assert_eq!(notify(&registry, "theme"), 1);
    assert!(a.try_recv().is_some());
    assert!(b.try_recv().is_none());
}

#[test]
fn dropping_an_observer_disconnects_it() {
    let registry = WatchRegistry::new();
    let observer = registry.connect();
    observer.watch(&["theme"]).unwrap();
    let id = observer.id();
    assert_eq!(registry.observer_count(), 1);

    drop(observer);
    assert_eq!(registry.observer_count(), 0);
    assert!(!registry.has_entry(id, Namespace::Preferences));
    assert_eq!(notify(&registry, "theme"), 0);
}

#[test]
fn closed_observer_is_pruned_on_broadcast() {
    let registry = WatchRegistry::new();
    let mut closed = registry.connect();
    let mut live = registry.connect();
    closed.watch(&["theme"]).unwrap();
    live.watch(&["theme"]).unwrap();

    closed.close();
    assert_eq!(notify(&registry, "theme"), 1);
    assert_eq!(registry.observer_count(), 1);
    assert!(!registry.has_entry(closed.id(), Namespace::Preferences));
    assert!(live.try_recv().is_some());
}

#[tokio::test]
async fn recv_waits_for_the_next_change() {
    let registry = WatchRegistry::new();
    let mut observer = registry.connect();
    observer.watch(&["zoom"]).unwrap();

    let sender = registry.clone();
    tokio::spawn(async move {
        sender.broadcast(SettingKind::Generic, "zoom", Some(json!(2)), Some(json!(1)));
    });

    let change = observer.recv().await.unwrap();
    assert_eq!(change.new_value, Some(json!(2)));
    assert_eq!(change.old_value, Some(json!(1)));
}
