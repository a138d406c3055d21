//! Multi-profile store for Haven.
//!
//! Each profile holds navigation history, downloads, bookmarks, autofill
//! entries, search engines, a generic settings map and a map of secure
//! settings whose values are individually encrypted. Imported browser data
//! is kept as secure settings, one per import source.
//!
//! The whole document lives in `profiles.json` and is replaced atomically
//! on every save. Mutations return before the write lands; history writes
//! are additionally debounced. [`ProfileStore::flush`] forces the pending
//! write at shutdown. Settings changes, plain and secure, are published
//! to sinks attached with [`ProfileStore::attach`].

mod collections;
mod error;
mod history;
mod import;
mod model;
mod secure;
mod session;
mod store;
mod validation;

pub use error::{StorageError, StorageResult};
pub use history::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_ENTRIES, score as history_score};
pub use import::{
    Autofill, Bookmarks, History, ImportBatch, ImportKind, ImportedAutofill, ImportedBookmark,
    ImportedHistoryEntry, ImportedPassword, ImportedSearchEngine, Passwords, SearchEngines,
};
pub use model::{
    AutofillEntry, Bookmark, DownloadRecord, DownloadState, DownloadUpdate, NavigationEntry,
    Profile, ProfileDocument, ProfileSettings, ProfileSummary, SearchEngine,
};
pub use session::{DirSessionProvider, SessionProvider};
pub use store::{
    DEFAULT_PROFILE_NAME, DEFAULT_SAVE_DEBOUNCE, PROFILES_FILE, ProfileSettingChange, ProfileStore,
    ProfileStoreConfig, StartupSignal,
};
pub use validation::{
    MAX_FIELD_BYTES, MAX_IMPORT_ENTRIES, MAX_SOURCE_LEN, Validate, ValidationError,
};
