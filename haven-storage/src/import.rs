//! Imported browser data.
//!
//! Each import source for a given kind lives in exactly one secure setting
//! keyed `<kind>.import.<source>`, holding an [`ImportBatch`]. The kinds are
//! zero-sized markers so the store exposes one generic set of operations.

use crate::validation::{Validate, ValidationError, validate_text, validate_url};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A kind of importable data.
pub trait ImportKind {
    /// Key prefix, e.g. `passwords`.
    const TYPE: &'static str;
    type Entry: Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static;

    /// Secure-setting key for one source.
    fn key(source: &str) -> String {
        format!("{}.import.{}", Self::TYPE, source)
    }

    /// Prefix shared by all sources of this kind.
    fn prefix() -> String {
        format!("{}.import.", Self::TYPE)
    }
}

/// One import from one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch<E> {
    pub entries: Vec<E>,
    pub timestamp: DateTime<Utc>,
    pub count: usize,
}

impl<E> ImportBatch<E> {
    pub fn new(entries: Vec<E>) -> Self {
        Self {
            count: entries.len(),
            entries,
            timestamp: Utc::now(),
        }
    }
}

// ── Kinds ────────────────────────────────────────────────────────

pub struct Passwords;
pub struct Bookmarks;
pub struct History;
pub struct Autofill;
pub struct SearchEngines;

impl ImportKind for Passwords {
    const TYPE: &'static str = "passwords";
    type Entry = ImportedPassword;
}

impl ImportKind for Bookmarks {
    const TYPE: &'static str = "bookmarks";
    type Entry = ImportedBookmark;
}

impl ImportKind for History {
    const TYPE: &'static str = "history";
    type Entry = ImportedHistoryEntry;
}

impl ImportKind for Autofill {
    const TYPE: &'static str = "autofill";
    type Entry = ImportedAutofill;
}

impl ImportKind for SearchEngines {
    const TYPE: &'static str = "searchEngines";
    type Entry = ImportedSearchEngine;
}

// ── Entries ──────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedPassword {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ImportedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedPassword")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Validate for ImportedPassword {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_url("url", &self.url)?;
        validate_text("username", &self.username)?;
        validate_text("password", &self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedBookmark {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub folder: Option<String>,
}

impl Validate for ImportedBookmark {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_url("url", &self.url)?;
        validate_text("title", &self.title)?;
        if let Some(folder) = &self.folder {
            validate_text("folder", folder)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedHistoryEntry {
    pub url: String,
    pub title: String,
    pub visit_count: u32,
    pub last_visit: DateTime<Utc>,
}

impl Validate for ImportedHistoryEntry {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_url("url", &self.url)?;
        validate_text("title", &self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedAutofill {
    pub field_name: String,
    pub value: String,
}

impl Validate for ImportedAutofill {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.field_name.is_empty() {
            return Err(ValidationError::EmptyField("fieldName"));
        }
        validate_text("fieldName", &self.field_name)?;
        validate_text("value", &self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSearchEngine {
    pub name: String,
    pub keyword: String,
    pub url_template: String,
}

impl Validate for ImportedSearchEngine {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_text("name", &self.name)?;
        validate_text("keyword", &self.keyword)?;
        validate_url("urlTemplate", &self.url_template)
    }
}
