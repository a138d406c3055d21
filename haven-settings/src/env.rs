//! Environment variables consulted for API keys.
//!
//! The process environment is captured once into a snapshot. Removing a
//! key edits the snapshot only; the OS environment is never mutated.

use crate::classify::ApiKeyType;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Read/remove access to environment variables.
pub trait EnvSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn remove(&self, name: &str);
}

/// Snapshot of the API-key environment variables.
#[derive(Debug, Default)]
pub struct EnvSnapshot {
    vars: RwLock<HashMap<String, String>>,
}

impl EnvSnapshot {
    /// Captures every variable mapped to an [`ApiKeyType`].
    pub fn capture() -> Self {
        let vars = ApiKeyType::ALL
            .into_iter()
            .flat_map(ApiKeyType::env_vars)
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: RwLock::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl EnvSource for EnvSnapshot {
    fn get(&self, name: &str) -> Option<String> {
        self.vars
            .read()
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    fn remove(&self, name: &str) {
        self.vars.write().remove(name);
    }
}
