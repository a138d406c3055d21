//! Input validation for import and store operations.
//!
//! Every check runs before the store is touched, so a rejected batch never
//! leaves a partial write behind.

use thiserror::Error;

/// Maximum length of an import source name.
pub const MAX_SOURCE_LEN: usize = 64;

/// Maximum entries in one import batch.
pub const MAX_IMPORT_ENTRIES: usize = 50_000;

/// Maximum size of any single string field (8 KiB).
pub const MAX_FIELD_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid import source name: {0:?}")]
    InvalidSource(String),
    #[error("too many entries: {count} (max: {max})")]
    TooManyEntries { count: usize, max: usize },
    #[error("field `{field}` exceeds size limit: {size} bytes (max: {max} bytes)")]
    FieldTooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
}

/// Checks a value before it enters the store.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Source names are 1-64 chars of `[A-Za-z0-9_-]`; they become part of a
/// secure-setting key.
pub fn validate_source(source: &str) -> Result<(), ValidationError> {
    let valid = !source.is_empty()
        && source.len() <= MAX_SOURCE_LEN
        && source
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidSource(source.to_string()))
    }
}

/// Bounds a free-text field.
pub fn validate_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_FIELD_BYTES {
        return Err(ValidationError::FieldTooLarge {
            field,
            size: value.len(),
            max: MAX_FIELD_BYTES,
        });
    }
    Ok(())
}

/// A URL must be present and bounded.
pub fn validate_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    validate_text(field, value)
}

/// Validates a batch: entry count first, then every entry.
pub fn validate_batch<T: Validate>(entries: &[T]) -> Result<(), ValidationError> {
    if entries.len() > MAX_IMPORT_ENTRIES {
        return Err(ValidationError::TooManyEntries {
            count: entries.len(),
            max: MAX_IMPORT_ENTRIES,
        });
    }
    entries.iter().try_for_each(Validate::validate)
}
