//! Profile document model.
//!
//! `profiles.json` is `{ "profiles": [...], "activeProfileId": "..." }`,
//! camelCase throughout. Only the values of `secureSettings` are
//! ciphertext; everything else is plain JSON.

use chrono::{DateTime, Utc};
use haven_types::ProfileId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The persisted profile document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub active_profile_id: Option<ProfileId>,
}

impl ProfileDocument {
    pub fn profile(&self, id: ProfileId) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub(crate) fn position(&self, id: ProfileId) -> Option<usize> {
        self.profiles.iter().position(|p| p.id == id)
    }
}

/// An isolated user identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub navigation_history: Vec<NavigationEntry>,
    #[serde(default)]
    pub downloads: Vec<DownloadRecord>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub autofill: Vec<AutofillEntry>,
    #[serde(default)]
    pub search_engines: Vec<SearchEngine>,
    #[serde(default)]
    pub settings: ProfileSettings,
    /// Key → ciphertext. Keys are namespaced by feature.
    #[serde(default)]
    pub secure_settings: BTreeMap<String, String>,
}

impl Profile {
    pub(crate) fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            name: name.to_string(),
            created_at: now,
            last_active: now,
            navigation_history: Vec::new(),
            downloads: Vec::new(),
            bookmarks: Vec::new(),
            autofill: Vec::new(),
            search_engines: Vec::new(),
            settings: ProfileSettings::default(),
            secure_settings: BTreeMap::new(),
        }
    }
}

/// Light-weight listing view of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: ProfileId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub is_active: bool,
}

/// Generic per-profile settings map with typed accessors for the known
/// preference names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileSettings(Map<String, Value>);

impl ProfileSettings {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) -> Option<Value> {
        self.0.insert(key.to_string(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merges a patch; `null` values remove the key.
    pub fn apply_patch(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            if value.is_null() {
                self.0.remove(&key);
            } else {
                self.0.insert(key, value);
            }
        }
    }

    pub fn theme(&self) -> Option<&str> {
        self.get("theme").and_then(Value::as_str)
    }

    pub fn default_search_engine(&self) -> Option<&str> {
        self.get("defaultSearchEngine").and_then(Value::as_str)
    }

    pub fn language(&self) -> Option<&str> {
        self.get("language").and_then(Value::as_str)
    }

    pub fn privacy_mode(&self) -> bool {
        self.get("privacyMode")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// One visited URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    pub url: String,
    pub title: String,
    pub visit_count: u32,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadState {
    InProgress,
    Completed,
    Cancelled,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    pub path: Option<String>,
    pub received_bytes: u64,
    pub total_bytes: Option<u64>,
    pub state: DownloadState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Partial update for a download. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct DownloadUpdate {
    pub received_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub state: Option<DownloadState>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub folder: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofillEntry {
    pub id: Uuid,
    pub field_name: String,
    pub value: String,
    pub use_count: u32,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEngine {
    pub id: Uuid,
    pub name: String,
    pub keyword: String,
    /// Query URL with `%s` where the search terms go.
    pub url_template: String,
}
