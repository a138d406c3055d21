//! Haven process wiring and operator commands.

pub mod app;
pub mod commands;
pub mod config;

pub use app::Haven;
pub use commands::{Command, ProfilesCommand, SettingsCommand, run};
pub use config::{APP_DIR_NAME, APP_STORE_NAME, DATA_DIR_ENV, HavenConfig, SESSIONS_DIR};
