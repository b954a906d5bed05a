//! On-disk persistence of the master key

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, VaultError};
use isolator_core::user_paths::ensure_private_dir;

/// Length of the AES-256 master key in bytes
pub const KEY_LENGTH: usize = 32;

/// File permissions for the key file
const FILE_PERMISSIONS: u32 = 0o600;

/// Read the key at `path`, generating and persisting `fresh()` if it is absent.
///
/// The file is opened with `create_new`, so when two processes race on first
/// use the loser reads the winner's key instead of overwriting it.
pub fn load_or_create(path: &Path, fresh: impl FnOnce() -> [u8; KEY_LENGTH]) -> Result<[u8; KEY_LENGTH]> {
    if path.exists() {
        return read_key(path);
    }

    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }

    let key = fresh();
    match create_key_file(path) {
        Ok(mut file) => {
            file.write_all(STANDARD.encode(key).as_bytes())?;
            file.sync_all()?;
            restrict_permissions(path)?;
            info!(key_path = %path.display(), "generated new master key");
            Ok(key)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(key_path = %path.display(), "master key created concurrently, loading it");
            read_key(path)
        }
        Err(e) => Err(VaultError::KeyFile(e)),
    }
}

/// Decode a base64 key file.
pub fn read_key(path: &Path) -> Result<[u8; KEY_LENGTH]> {
    let content = fs::read_to_string(path)?;
    let bytes = STANDARD
        .decode(content.trim())
        .map_err(|e| VaultError::InvalidKey(format!("{}: {}", path.display(), e)))?;

    bytes.try_into().map_err(|bytes: Vec<u8>| {
        VaultError::InvalidKey(format!(
            "{}: expected {} bytes, found {}",
            path.display(),
            KEY_LENGTH,
            bytes.len()
        ))
    })
}

fn create_key_file(path: &Path) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_PERMISSIONS);
    }

    options.open(path)
}

fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(FILE_PERMISSIONS))?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
