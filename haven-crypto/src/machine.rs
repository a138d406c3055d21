//! Machine identity for the fallback key.
//!
//! Produces a stable identifier for this device from hardware and OS
//! identifiers. It survives reboots but changes when the machine does,
//! which is exactly what makes the fallback key machine-bound.

use sha2::{Digest, Sha256};
use std::env;

/// A stable identifier for the current machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIdentity {
    id: String,
}

impl MachineIdentity {
    /// Computes the identity of the current machine.
    #[must_use]
    pub fn current() -> Self {
        Self::from_components(&collect_components())
    }

    /// Computes an identity from explicit components.
    #[must_use]
    pub fn from_components(components: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(components.join("|").as_bytes());
        let hash = hasher.finalize();

        let id = hash.iter().map(|b| format!("{:02x}", b)).collect();
        Self { id }
    }

    /// Returns the hex identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

fn collect_components() -> Vec<String> {
    let mut ids = vec![env::consts::OS.to_string(), env::consts::ARCH.to_string()];

    ids.push(
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string()),
    );

    if let Some(machine_id) = platform_machine_id() {
        ids.push(machine_id);
    }

    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        ids.push(user);
    }

    ids
}

fn platform_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
