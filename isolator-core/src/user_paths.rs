//! Per-user state locations for Isolator.
//!
//! Everything Isolator persists lives under a single directory, `~/.isolator`
//! by default: the SQLite database and the master key used by the vault.

use crate::error::{CoreError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory permissions for the state directory
pub const DIR_PERMISSIONS: u32 = 0o700;

/// Name of the state directory inside the user's home.
pub const STATE_DIR_NAME: &str = ".isolator";

/// Get the user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| CoreError::Config("Could not determine home directory".into()))
}

/// Get the Isolator state directory (`~/.isolator`).
#[must_use = "state directory path should be used"]
pub fn isolator_state_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(STATE_DIR_NAME))
}

/// Create `path` (and parents) if missing, restricting it to the owner on Unix.
///
/// Permissions are only applied when the directory is created here, so an
/// existing directory the user configured by hand is left alone.
pub fn ensure_private_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(DIR_PERMISSIONS))?;
    }

    Ok(())
}
