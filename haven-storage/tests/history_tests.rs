mod common;

use chrono::{Duration, Utc};
use common::open_store;
use haven_storage::MAX_HISTORY_ENTRIES;
use pretty_assertions::assert_eq;

// ── Ordering and ranking ─────────────────────────────────────────

#[tokio::test]
async fn repeated_visits_outrank_single_visit() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.create_profile("Default").await.unwrap();

    store.add_navigation_entry(id, "https://a.com", "A").await.unwrap();
    store.add_navigation_entry(id, "https://a.com", "A").await.unwrap();
    store.add_navigation_entry(id, "https://b.com", "B").await.unwrap();

    let history = store.get_navigation_history(id, None, Some(10)).await.unwrap();
    let summary: Vec<(&str, u32)> = history
        .iter()
        .map(|e| (e.url.as_str(), e.visit_count))
        .collect();
    assert_eq!(summary, vec![("https://a.com", 2), ("https://b.com", 1)]);
}

#[tokio::test]
async fn frequent_recent_beats_old() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();
    let now = Utc::now();

    store
        .record_visit_at(id, "https://a.com", "A", now - Duration::days(10))
        .await
        .unwrap();
    for _ in 0..5 {
        store
            .record_visit_at(id, "https://b.com", "B", now - Duration::hours(1))
            .await
            .unwrap();
    }

    let history = store.get_navigation_history(id, None, None).await.unwrap();
    assert_eq!(history[0].url, "https://b.com");
    assert_eq!(history[1].url, "https://a.com");
}

#[tokio::test]
async fn query_filters_and_limit_applies() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    for n in 0..20 {
        store
            .add_navigation_entry(id, &format!("https://site{n}.example"), "Example")
            .await
            .unwrap();
    }
    store
        .add_navigation_entry(id, "https://docs.rs", "Rust documentation")
        .await
        .unwrap();

    assert_eq!(store.get_navigation_history(id, None, None).await.unwrap().len(), 10);
    let hits = store
        .get_navigation_history(id, Some("RUST"), None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://docs.rs");
}

#[tokio::test]
async fn history_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();
    let start = Utc::now() - Duration::days(1);

    for n in 0..1050 {
        store
            .record_visit_at(
                id,
                &format!("https://u{n}.example"),
                "",
                start + Duration::seconds(n),
            )
            .await
            .unwrap();
    }

    let profile = store.get_profile(id).await.unwrap();
    assert_eq!(profile.navigation_history.len(), MAX_HISTORY_ENTRIES);
    assert_eq!(profile.navigation_history[0].url, "https://u1049.example");
    assert!(
        profile
            .navigation_history
            .iter()
            .all(|e| e.url != "https://u49.example" && e.url != "https://u0.example")
    );
    assert!(
        profile
            .navigation_history
            .iter()
            .any(|e| e.url == "https://u50.example")
    );
}

#[tokio::test]
async fn remove_and_clear_history() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    store.add_navigation_entry(id, "https://a.com", "A").await.unwrap();
    store.add_navigation_entry(id, "https://b.com", "B").await.unwrap();
    assert!(store.remove_navigation_entry(id, "https://a.com").await.unwrap());
    assert!(!store.remove_navigation_entry(id, "https://a.com").await.unwrap());

    store.clear_navigation_history(id).await.unwrap();
    assert!(store.get_navigation_history(id, None, None).await.unwrap().is_empty());
}

// ── Debounced persistence ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn history_write_waits_for_debounce_window() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();
    // Let the first-launch save land.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let read = || std::fs::read_to_string(store.path()).unwrap();
    assert!(!read().contains("a.com"));

    for _ in 0..3 {
        store.add_navigation_entry(id, "https://a.com", "A").await.unwrap();
    }
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    let mid_window = read();
    assert!(!mid_window.contains("a.com"));
    // The file on disk is still a complete document.
    serde_json::from_str::<serde_json::Value>(&mid_window).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    let written = read();
    assert!(written.contains("https://a.com"));
    assert!(written.contains("\"visitCount\": 3"));
}

#[tokio::test(start_paused = true)]
async fn flush_writes_pending_history_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_store(dir.path()).await;
    let id = store.active_profile_id().await.unwrap().unwrap();

    store.add_navigation_entry(id, "https://b.com", "B").await.unwrap();
    store.flush().await.unwrap();

    let on_disk = std::fs::read_to_string(store.path()).unwrap();
    assert!(on_disk.contains("https://b.com"));
}
