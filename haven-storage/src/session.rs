//! Per-profile browsing sessions.
//!
//! Each profile owns one isolated partition (cookies, cache, local
//! storage). The store creates it when a profile is created or loaded and
//! destroys it, storage included, when the profile is deleted.

use haven_types::ProfileId;
use haven_vault::create_private_dir;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Creates and tears down browsing-session partitions.
pub trait SessionProvider: Send + Sync {
    /// Ensures the partition for `profile` exists. Idempotent.
    fn create(&self, profile: ProfileId) -> io::Result<()>;

    /// Destroys the partition and everything stored in it.
    fn destroy(&self, profile: ProfileId) -> io::Result<()>;
}

/// Partitions as directories under `<root>/<profile-id>/`.
pub struct DirSessionProvider {
    root: PathBuf,
}

impl DirSessionProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Partition directory for a profile.
    pub fn partition(&self, profile: ProfileId) -> PathBuf {
        self.root.join(profile.to_string())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SessionProvider for DirSessionProvider {
    fn create(&self, profile: ProfileId) -> io::Result<()> {
        let dir = self.partition(profile);
        create_private_dir(&dir)?;
        debug!(profile_id = %profile, path = %dir.display(), "Session partition ready");
        Ok(())
    }

    fn destroy(&self, profile: ProfileId) -> io::Result<()> {
        let dir = self.partition(profile);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(profile_id = %profile, "Session partition cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_partition() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirSessionProvider::new(dir.path().join("sessions"));
        let id = ProfileId::new();

        provider.create(id).unwrap();
        std::fs::write(provider.partition(id).join("Cookies"), b"c").unwrap();
        assert!(provider.partition(id).is_dir());

        provider.destroy(id).unwrap();
        assert!(!provider.partition(id).exists());
        // Second destroy is a no-op.
        provider.destroy(id).unwrap();
    }
}
