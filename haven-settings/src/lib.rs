//! Settings resolution for Haven.
//!
//! [`SettingsResolver`] is the single read/write entry point for settings.
//! Keys are classified by [`classify`] into profile preferences, API keys
//! or generic app settings. API keys fall back to environment variables
//! and are migrated into encrypted profile storage on first use.
//! [`WatchRegistry`] fans changes out to observers that asked for them;
//! [`WatchForwarder`] feeds it from the stores' change events, so writes
//! made directly on a store are seen too.

mod classify;
mod env;
mod error;
mod resolver;
mod watch;

pub use classify::{ApiKeyType, PREFERENCE_KEYS, SettingKind, classify};
pub use env::{EnvSnapshot, EnvSource};
pub use error::{SettingsError, SettingsResult};
pub use haven_vault::REDACTED_MARKER;
pub use resolver::{SettingsResolver, WatchForwarder};
pub use watch::{ChangeNotification, Namespace, Observer, WatchRegistry};
