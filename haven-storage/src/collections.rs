//! Plain per-profile collections: history, downloads, bookmarks, autofill
//! and search engines.

use crate::error::{StorageError, StorageResult};
use crate::history::{self, DEFAULT_HISTORY_LIMIT};
use crate::model::{
    AutofillEntry, Bookmark, DownloadRecord, DownloadState, DownloadUpdate, NavigationEntry,
    SearchEngine,
};
use crate::store::{ProfileStore, Save};
use crate::validation::{validate_text, validate_url};
use chrono::{DateTime, Utc};
use haven_types::ProfileId;
use uuid::Uuid;

impl ProfileStore {
    // ── Navigation history ───────────────────────────────────────

    /// Records a visit now. Saved after the debounce window.
    pub async fn add_navigation_entry(
        &self,
        profile: ProfileId,
        url: &str,
        title: &str,
    ) -> StorageResult<()> {
        self.record_visit_at(profile, url, title, Utc::now()).await
    }

    /// Records a visit at an explicit time.
    pub async fn record_visit_at(
        &self,
        profile: ProfileId,
        url: &str,
        title: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        validate_url("url", url)?;
        validate_text("title", title)?;
        self.mutate(Save::Debounced, |state| {
            state.update_profile(profile, |p| {
                history::record_visit(&mut p.navigation_history, url, title, at);
                Ok(())
            })
        })
        .await
    }

    /// Ranked history, optionally filtered by a case-insensitive query.
    pub async fn get_navigation_history(
        &self,
        profile: ProfileId,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> StorageResult<Vec<NavigationEntry>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        self.read(|state| {
            let entries = &state.profile(profile)?.navigation_history;
            Ok(history::rank(entries, query, limit, Utc::now()))
        })
        .await
    }

    /// Removes one URL. Returns whether it was present.
    pub async fn remove_navigation_entry(
        &self,
        profile: ProfileId,
        url: &str,
    ) -> StorageResult<bool> {
        self.mutate(Save::Debounced, |state| {
            state.update_profile(profile, |p| {
                let before = p.navigation_history.len();
                p.navigation_history.retain(|e| e.url != url);
                Ok(p.navigation_history.len() != before)
            })
        })
        .await
    }

    pub async fn clear_navigation_history(&self, profile: ProfileId) -> StorageResult<()> {
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                p.navigation_history.clear();
                Ok(())
            })
        })
        .await
    }

    // ── Downloads ────────────────────────────────────────────────

    pub async fn add_download(
        &self,
        profile: ProfileId,
        url: &str,
        filename: &str,
    ) -> StorageResult<Uuid> {
        validate_url("url", url)?;
        validate_text("filename", filename)?;
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                let record = DownloadRecord {
                    id: Uuid::new_v4(),
                    url: url.to_string(),
                    filename: filename.to_string(),
                    path: None,
                    received_bytes: 0,
                    total_bytes: None,
                    state: DownloadState::InProgress,
                    started_at: Utc::now(),
                    finished_at: None,
                };
                let id = record.id;
                p.downloads.insert(0, record);
                Ok(id)
            })
        })
        .await
    }

    /// Applies progress or a state change. Leaving `InProgress` stamps
    /// `finished_at`.
    pub async fn update_download(
        &self,
        profile: ProfileId,
        id: Uuid,
        update: DownloadUpdate,
    ) -> StorageResult<DownloadRecord> {
        if let Some(path) = &update.path {
            validate_text("path", path)?;
        }
        self.mutate(Save::Debounced, |state| {
            state.update_profile(profile, |p| {
                let record = p
                    .downloads
                    .iter_mut()
                    .find(|d| d.id == id)
                    .ok_or_else(|| StorageError::NotFound(format!("download {id}")))?;
                if let Some(received) = update.received_bytes {
                    record.received_bytes = received;
                }
                if let Some(total) = update.total_bytes {
                    record.total_bytes = Some(total);
                }
                if let Some(path) = update.path {
                    record.path = Some(path);
                }
                if let Some(new_state) = update.state {
                    if new_state != DownloadState::InProgress && record.finished_at.is_none() {
                        record.finished_at = Some(Utc::now());
                    }
                    record.state = new_state;
                }
                Ok(record.clone())
            })
        })
        .await
    }

    pub async fn get_downloads(&self, profile: ProfileId) -> StorageResult<Vec<DownloadRecord>> {
        self.read(|state| Ok(state.profile(profile)?.downloads.clone()))
            .await
    }

    /// Clears finished downloads; in-progress ones are kept.
    pub async fn clear_downloads(&self, profile: ProfileId) -> StorageResult<usize> {
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                let before = p.downloads.len();
                p.downloads.retain(|d| d.state == DownloadState::InProgress);
                Ok(before - p.downloads.len())
            })
        })
        .await
    }

    // ── Bookmarks ────────────────────────────────────────────────

    pub async fn add_bookmark(
        &self,
        profile: ProfileId,
        url: &str,
        title: &str,
        folder: Option<&str>,
    ) -> StorageResult<Uuid> {
        validate_url("url", url)?;
        validate_text("title", title)?;
        if let Some(folder) = folder {
            validate_text("folder", folder)?;
        }
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                let bookmark = Bookmark {
                    id: Uuid::new_v4(),
                    url: url.to_string(),
                    title: title.to_string(),
                    folder: folder.map(str::to_string),
                    created_at: Utc::now(),
                };
                let id = bookmark.id;
                p.bookmarks.push(bookmark);
                Ok(id)
            })
        })
        .await
    }

    pub async fn remove_bookmark(&self, profile: ProfileId, id: Uuid) -> StorageResult<bool> {
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                let before = p.bookmarks.len();
                p.bookmarks.retain(|b| b.id != id);
                Ok(p.bookmarks.len() != before)
            })
        })
        .await
    }

    pub async fn get_bookmarks(&self, profile: ProfileId) -> StorageResult<Vec<Bookmark>> {
        self.read(|state| Ok(state.profile(profile)?.bookmarks.clone()))
            .await
    }

    // ── Autofill ─────────────────────────────────────────────────

    /// Adds a value for a form field, or bumps its use count if the same
    /// value is already known.
    pub async fn add_autofill_entry(
        &self,
        profile: ProfileId,
        field_name: &str,
        value: &str,
    ) -> StorageResult<Uuid> {
        validate_text("fieldName", field_name)?;
        validate_text("value", value)?;
        self.mutate(Save::Debounced, |state| {
            state.update_profile(profile, |p| {
                let now = Utc::now();
                if let Some(existing) = p
                    .autofill
                    .iter_mut()
                    .find(|e| e.field_name == field_name && e.value == value)
                {
                    existing.use_count = existing.use_count.saturating_add(1);
                    existing.last_used = now;
                    return Ok(existing.id);
                }
                let entry = AutofillEntry {
                    id: Uuid::new_v4(),
                    field_name: field_name.to_string(),
                    value: value.to_string(),
                    use_count: 1,
                    last_used: now,
                };
                let id = entry.id;
                p.autofill.push(entry);
                Ok(id)
            })
        })
        .await
    }

    /// Entries for one field (or all), most used first.
    pub async fn get_autofill_entries(
        &self,
        profile: ProfileId,
        field_name: Option<&str>,
    ) -> StorageResult<Vec<AutofillEntry>> {
        self.read(|state| {
            let mut entries: Vec<AutofillEntry> = state
                .profile(profile)?
                .autofill
                .iter()
                .filter(|e| field_name.is_none_or(|f| e.field_name == f))
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.use_count.cmp(&a.use_count));
            Ok(entries)
        })
        .await
    }

    pub async fn remove_autofill_entry(&self, profile: ProfileId, id: Uuid) -> StorageResult<bool> {
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                let before = p.autofill.len();
                p.autofill.retain(|e| e.id != id);
                Ok(p.autofill.len() != before)
            })
        })
        .await
    }

    // ── Search engines ───────────────────────────────────────────

    /// Adds a search engine. Keywords are unique per profile; adding an
    /// existing keyword replaces that engine.
    pub async fn add_search_engine(
        &self,
        profile: ProfileId,
        name: &str,
        keyword: &str,
        url_template: &str,
    ) -> StorageResult<Uuid> {
        validate_text("name", name)?;
        validate_text("keyword", keyword)?;
        validate_url("urlTemplate", url_template)?;
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                p.search_engines.retain(|e| e.keyword != keyword);
                let engine = SearchEngine {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    keyword: keyword.to_string(),
                    url_template: url_template.to_string(),
                };
                let id = engine.id;
                p.search_engines.push(engine);
                Ok(id)
            })
        })
        .await
    }

    pub async fn remove_search_engine(&self, profile: ProfileId, id: Uuid) -> StorageResult<bool> {
        self.mutate(Save::Immediate, |state| {
            state.update_profile(profile, |p| {
                let before = p.search_engines.len();
                p.search_engines.retain(|e| e.id != id);
                Ok(p.search_engines.len() != before)
            })
        })
        .await
    }

    pub async fn get_search_engines(&self, profile: ProfileId) -> StorageResult<Vec<SearchEngine>> {
        self.read(|state| Ok(state.profile(profile)?.search_engines.clone()))
            .await
    }
}
