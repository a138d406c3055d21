//! Setting key classification.
//!
//! Decides once per key where a setting lives. First match wins:
//! profile preference allow-list, then API-key names, then generic.

use crate::error::{SettingsError, SettingsResult};
use serde::Serialize;
use std::fmt;

/// Keys stored as per-profile preferences.
pub const PREFERENCE_KEYS: [&str; 4] = ["defaultSearchEngine", "theme", "language", "privacyMode"];

/// Conventional suffix of API-key setting names, compared after
/// normalization.
const API_KEY_SUFFIX: &str = "apikey";

/// Prefix of API-key entries in a profile's secure settings.
const SECURE_KEY_PREFIX: &str = "api_keys.";

/// Known API-key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyType {
    OpenAi,
    Anthropic,
    Google,
    Github,
    Llm,
    Vector,
}

impl ApiKeyType {
    pub const ALL: [ApiKeyType; 6] = [
        Self::OpenAi,
        Self::Anthropic,
        Self::Google,
        Self::Github,
        Self::Llm,
        Self::Vector,
    ];

    /// Canonical type string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Github => "github",
            Self::Llm => "llm",
            Self::Vector => "vector",
        }
    }

    /// Parses a canonical type string, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    /// Environment variables consulted when no key is stored, in order.
    pub fn env_vars(self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
            Self::Google => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Self::Github => &["GITHUB_TOKEN"],
            Self::Llm | Self::Vector => &[],
        }
    }

    /// Setting name used when listing all settings, e.g. `openaiApiKey`.
    pub fn setting_key(self) -> String {
        format!("{}ApiKey", self.as_str())
    }

    /// Secure-setting key in the profile store.
    pub fn secure_key(self) -> String {
        format!("{SECURE_KEY_PREFIX}{}", self.as_str())
    }

    /// Inverse of [`secure_key`](Self::secure_key).
    pub fn from_secure_key(key: &str) -> Option<Self> {
        key.strip_prefix(SECURE_KEY_PREFIX).and_then(Self::parse)
    }
}

impl fmt::Display for ApiKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a setting lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKind {
    Preference,
    ApiKey(ApiKeyType),
    Generic,
}

/// Classifies a setting key.
///
/// API-key names match case-insensitively with or without an `ApiKey`
/// suffix (`openai`, `OPENAI_API_KEY`, `openaiApiKey`). A name carrying the
/// suffix whose stem is not a known type is rejected with
/// [`SettingsError::InvalidKeyType`] rather than treated as generic.
pub fn classify(key: &str) -> SettingsResult<SettingKind> {
    if PREFERENCE_KEYS.contains(&key) {
        return Ok(SettingKind::Preference);
    }

    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();

    if let Some(stem) = normalized.strip_suffix(API_KEY_SUFFIX) {
        return ApiKeyType::parse(stem)
            .map(SettingKind::ApiKey)
            .ok_or_else(|| SettingsError::InvalidKeyType(key.to_string()));
    }

    Ok(match ApiKeyType::parse(&normalized) {
        Some(t) => SettingKind::ApiKey(t),
        None => SettingKind::Generic,
    })
}
