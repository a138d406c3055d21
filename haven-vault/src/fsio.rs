//! Private-file helpers shared by every on-disk store.

use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::NamedTempFile;

/// Permission mode for directories (owner rwx only).
pub const DIR_PERMISSIONS: u32 = 0o700;

/// Permission mode for private files (owner rw only).
pub const FILE_PERMISSIONS: u32 = 0o600;

/// Creates a directory (and parents) readable only by the owner.
pub fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(DIR_PERMISSIONS))?;
    Ok(())
}

/// Replaces `path` with `contents` atomically.
///
/// Writes to a temp file in the same directory, syncs it, then renames it
/// over the target, so readers see either the old or the new file.
pub fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing parent directory")
    })?;
    create_private_dir(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    #[cfg(unix)]
    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(FILE_PERMISSIONS))?;

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
