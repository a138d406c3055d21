//! Which runtime keys need encryption.
//!
//! This is the only place the rule lives; the desktop store, the settings
//! layer and tooling all call [`is_secure_key`].

/// Prefix marking a key as secure.
pub const SECURE_PREFIX: &str = "secure.";

/// Infix marking a key as secure.
pub const SECURE_INFIX: &str = ".secure.";

/// Suffixes marking a key as secure.
pub const SECURE_SUFFIXES: &[&str] = &[".apiKeys", ".passwords"];

/// Returns true if `key` must be stored through the secure cell store.
#[must_use]
pub fn is_secure_key(key: &str) -> bool {
    key.starts_with(SECURE_PREFIX)
        || key.contains(SECURE_INFIX)
        || SECURE_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}
