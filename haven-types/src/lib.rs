//! Core type definitions for Haven.
//!
//! This crate defines the identifiers shared by every layer of the
//! storage core:
//! - Profile identifiers (UUID v7)
//! - Observer identifiers for change-notification subscribers
//!
//! Domain records (history, downloads, imports, ...) live next to the
//! store that owns them, not here.

mod ids;

pub use ids::{ObserverId, ProfileId};
