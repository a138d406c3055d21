//! Operator commands.

use crate::app::Haven;
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use haven_types::ProfileId;
use serde_json::Value;
use std::fmt::Write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),

    /// Read and write settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Search the active profile's history
    History {
        /// Case-insensitive URL or title filter
        query: Option<String>,

        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    List,
    Create { name: String },
    Delete { id: ProfileId },
    /// Make a profile active
    Use { id: ProfileId },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    Get { key: String },
    /// Set a value; anything that is not valid JSON is stored as a string
    Set { key: String, value: String },
    Rm { key: String },
    /// Print every setting, secrets masked
    All {
        #[arg(long)]
        unmasked: bool,
    },
}

/// Runs a command and returns what should be printed.
pub async fn run(haven: &Haven, command: Command) -> Result<String> {
    match command {
        Command::Profiles(cmd) => profiles(haven, cmd).await,
        Command::Settings(cmd) => settings(haven, cmd).await,
        Command::History { query, limit } => history(haven, query.as_deref(), limit).await,
    }
}

async fn profiles(haven: &Haven, command: ProfilesCommand) -> Result<String> {
    let store = &haven.profiles;
    match command {
        ProfilesCommand::List => {
            let mut out = String::new();
            for p in store.list_profiles().await? {
                let marker = if p.is_active { '*' } else { ' ' };
                writeln!(
                    out,
                    "{marker} {}  {}  (last active {})",
                    p.id,
                    p.name,
                    p.last_active.format("%Y-%m-%d %H:%M")
                )?;
            }
            Ok(out.trim_end().to_string())
        }
        ProfilesCommand::Create { name } => {
            let id = store.create_profile(&name).await?;
            Ok(id.to_string())
        }
        ProfilesCommand::Delete { id } => {
            let active = store.delete_profile(id).await?;
            Ok(match active {
                Some(active) => format!("deleted {id}, active profile is {active}"),
                None => format!("deleted {id}, no profiles left"),
            })
        }
        ProfilesCommand::Use { id } => {
            store.set_active_profile(id).await?;
            Ok(format!("active profile is {id}"))
        }
    }
}

async fn settings(haven: &Haven, command: SettingsCommand) -> Result<String> {
    let resolver = &haven.settings;
    match command {
        SettingsCommand::Get { key } => match resolver.get_setting(&key).await? {
            Some(value) => Ok(serde_json::to_string_pretty(&value)?),
            None => bail!("{key} is not set"),
        },
        SettingsCommand::Set { key, value } => {
            let value = parse_value(&value);
            resolver
                .set_setting(&key, value)
                .await
                .with_context(|| format!("setting {key}"))?;
            Ok(String::new())
        }
        SettingsCommand::Rm { key } => {
            resolver.remove_setting(&key).await?;
            Ok(String::new())
        }
        SettingsCommand::All { unmasked } => {
            let all = resolver.get_all_settings(!unmasked).await?;
            Ok(serde_json::to_string_pretty(&Value::Object(all))?)
        }
    }
}

async fn history(haven: &Haven, query: Option<&str>, limit: Option<usize>) -> Result<String> {
    let Some(profile) = haven.profiles.active_profile_id().await? else {
        bail!("no active profile");
    };
    let entries = haven
        .profiles
        .get_navigation_history(profile, query, limit)
        .await?;

    let mut out = String::new();
    for entry in entries {
        writeln!(
            out,
            "{:>5}  {}  {}",
            entry.visit_count, entry.url, entry.title
        )?;
    }
    Ok(out.trim_end().to_string())
}

/// JSON if it parses, else the raw string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
