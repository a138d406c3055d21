mod common;

use common::{ChangeLog, RecordingSessions, open_store, store_at};
use haven_crypto::{FallbackKdfParams, FallbackKeyMaterial, SafeStorage, UnavailablePlatform};
use haven_storage::{
    Bookmarks, ImportedBookmark, ImportedPassword, MAX_IMPORT_ENTRIES, Passwords, ProfileStore,
    ProfileStoreConfig, StartupSignal, StorageError, ValidationError,
};
use haven_vault::REDACTED_MARKER;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn password(url: &str, user: &str) -> ImportedPassword {
    ImportedPassword {
        url: url.into(),
        username: user.into(),
        password: format!("pw-{user}"),
    }
}

// ── Secure settings ──────────────────────────────────────────────

#[tokio::test]
async fn secure_setting_roundtrip_is_ciphertext_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    store.set_secure_setting(id, "apns_config", "top-secret").await.unwrap();
    assert_eq!(
        store.get_secure_setting(id, "apns_config").await.unwrap().as_deref(),
        Some("top-secret")
    );
    assert_eq!(store.secure_setting_keys(id).await.unwrap(), vec!["apns_config"]);

    store.flush().await.unwrap();
    let on_disk = std::fs::read_to_string(store.path()).unwrap();
    assert!(on_disk.contains("apns_config"));
    assert!(!on_disk.contains("top-secret"));

    assert!(store.remove_secure_setting(id, "apns_config").await.unwrap());
    assert_eq!(store.get_secure_setting(id, "apns_config").await.unwrap(), None);
}

#[tokio::test]
async fn secure_changes_are_published_redacted() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();
    let log = Arc::new(ChangeLog::default());
    store.attach(log.clone());

    store.set_secure_setting(id, "api_keys.openai", "sk-1").await.unwrap();
    store.set_secure_setting(id, "api_keys.openai", "sk-2").await.unwrap();
    store.remove_secure_setting(id, "api_keys.openai").await.unwrap();
    store.remove_secure_setting(id, "api_keys.openai").await.unwrap();

    let events = log.take();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.secure && e.active));
    assert_eq!(events[0].change.new_value, Some(json!(REDACTED_MARKER)));
    assert_eq!(events[0].change.old_value, None);
    assert_eq!(events[1].change.old_value, Some(json!(REDACTED_MARKER)));
    assert_eq!(events[2].change.new_value, None);
    let rendered = format!("{events:?}");
    assert!(!rendered.contains("sk-1"));
    assert!(!rendered.contains("sk-2"));
}

#[tokio::test]
async fn secure_settings_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let (store, _) = open_store(dir.path()).await;
        let id = store.active_profile_id().await.unwrap().unwrap();
        store.set_secure_setting(id, "token", "abc").await.unwrap();
        store.flush().await.unwrap();
        id
    };

    let (reopened, _) = open_store(dir.path()).await;
    assert_eq!(reopened.active_profile_id().await.unwrap(), Some(id));
    assert_eq!(
        reopened.get_secure_setting(id, "token").await.unwrap().as_deref(),
        Some("abc")
    );
}

#[tokio::test]
async fn value_from_other_key_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let (store, _) = open_store(dir.path()).await;
        let id = store.active_profile_id().await.unwrap().unwrap();
        store.set_secure_setting(id, "token", "abc").await.unwrap();
        store.flush().await.unwrap();
        id
    };

    let other = store_at(dir.path(), 99, Arc::new(RecordingSessions::default()));
    other.initialize().await.unwrap();
    assert_eq!(other.get_secure_setting(id, "token").await.unwrap(), None);
    // The key is still listed; only its value is unrecoverable.
    assert_eq!(other.secure_setting_keys(id).await.unwrap(), vec!["token"]);
}

#[tokio::test]
async fn failed_encryption_rejects_write() {
    let dir = tempfile::tempdir().unwrap();
    let broken = Arc::new(SafeStorage::new(
        Arc::new(UnavailablePlatform),
        FallbackKeyMaterial {
            machine_id: String::new(),
            platform: "linux".into(),
            app_version: "0.4.0".into(),
        },
        FallbackKdfParams::default(),
    ));
    let store = ProfileStore::new(
        ProfileStoreConfig::new(dir.path()),
        broken,
        Arc::new(RecordingSessions::default()),
        StartupSignal::fired(),
    );
    store.initialize().await.unwrap();
    let id = store.active_profile_id().await.unwrap().unwrap();

    assert!(matches!(
        store.set_secure_setting(id, "token", "abc").await.unwrap_err(),
        StorageError::Crypto(_)
    ));
    assert!(store.secure_setting_keys(id).await.unwrap().is_empty());
}

// ── Imports ──────────────────────────────────────────────────────

#[tokio::test]
async fn password_import_sources_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    let count = store
        .store_imported::<Passwords>(
            id,
            "chrome",
            vec![password("https://a.com", "ann"), password("https://b.com", "bob")],
        )
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        store.import_sources::<Passwords>(id).await.unwrap(),
        vec!["chrome"]
    );
    assert_eq!(store.get_imported::<Passwords>(id, None).await.unwrap().len(), 2);

    assert!(store.remove_imported::<Passwords>(id, "chrome").await.unwrap());
    assert!(store.import_sources::<Passwords>(id).await.unwrap().is_empty());
    assert!(store.get_imported::<Passwords>(id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn imports_concatenate_across_sources_and_stay_separate_by_kind() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    store
        .store_imported::<Passwords>(id, "chrome", vec![password("https://a.com", "ann")])
        .await
        .unwrap();
    store
        .store_imported::<Passwords>(id, "firefox", vec![password("https://b.com", "bob")])
        .await
        .unwrap();
    store
        .store_imported::<Bookmarks>(
            id,
            "chrome",
            vec![ImportedBookmark {
                url: "https://rust-lang.org".into(),
                title: "Rust".into(),
                folder: None,
            }],
        )
        .await
        .unwrap();

    let all = store.get_imported::<Passwords>(id, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let firefox = store
        .get_imported::<Passwords>(id, Some("firefox"))
        .await
        .unwrap();
    assert_eq!(firefox, vec![password("https://b.com", "bob")]);

    assert_eq!(store.clear_imported::<Passwords>(id).await.unwrap(), 2);
    assert!(store.import_sources::<Passwords>(id).await.unwrap().is_empty());
    assert_eq!(store.import_sources::<Bookmarks>(id).await.unwrap(), vec!["chrome"]);
}

#[tokio::test]
async fn reimport_replaces_source() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    store
        .store_imported::<Passwords>(id, "chrome", vec![password("https://a.com", "ann")])
        .await
        .unwrap();
    store
        .store_imported::<Passwords>(id, "chrome", vec![password("https://c.com", "cat")])
        .await
        .unwrap();

    let entries = store.get_imported::<Passwords>(id, None).await.unwrap();
    assert_eq!(entries, vec![password("https://c.com", "cat")]);
}

// ── Validation ───────────────────────────────────────────────────

#[tokio::test]
async fn invalid_imports_leave_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    let bad_source = store
        .store_imported::<Passwords>(id, "../chrome", vec![password("https://a.com", "a")])
        .await
        .unwrap_err();
    assert!(matches!(
        bad_source,
        StorageError::Validation(ValidationError::InvalidSource(_))
    ));

    let bad_entry = store
        .store_imported::<Passwords>(
            id,
            "chrome",
            vec![password("https://a.com", "a"), password("", "b")],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        bad_entry,
        StorageError::Validation(ValidationError::EmptyField("url"))
    ));

    let huge = store
        .store_imported::<Passwords>(
            id,
            "chrome",
            vec![password("https://a.com", &"u".repeat(9 * 1024))],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        huge,
        StorageError::Validation(ValidationError::FieldTooLarge { field: "username", .. })
    ));

    let too_many = vec![password("https://a.com", "a"); MAX_IMPORT_ENTRIES + 1];
    assert!(matches!(
        store
            .store_imported::<Passwords>(id, "chrome", too_many)
            .await
            .unwrap_err(),
        StorageError::Validation(ValidationError::TooManyEntries { .. })
    ));

    assert!(store.secure_setting_keys(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn profiles_keep_secure_settings_apart() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let default = store.active_profile_id().await.unwrap().unwrap();
    let work = store.create_profile("Work").await.unwrap();

    store.set_secure_setting(default, "k", "home").await.unwrap();
    store.set_secure_setting(work, "k", "office").await.unwrap();
    assert_eq!(
        store.get_secure_setting(default, "k").await.unwrap().as_deref(),
        Some("home")
    );
    assert_eq!(
        store.get_secure_setting(work, "k").await.unwrap().as_deref(),
        Some("office")
    );
}
