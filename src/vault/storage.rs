//! Reading and writing vault files.
//!
//! The container bytes are opaque here; this layer only moves them
//! between memory and disk.

use std::fs;
use std::path::Path;

use crate::errors::{LockboxError, Result};

/// Read a whole vault file.
pub fn read_vault(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(LockboxError::VaultNotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

/// Write a vault file to disk **atomically**.
///
/// The bytes go to a temp file in the same directory which is then renamed
/// over the target, so readers never see a half-written vault.  On Unix
/// the file is restricted to owner read/write.
pub fn write_vault(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&tmp_path, path)?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "vault written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.vault");

        write_vault(&path, b"container bytes").unwrap();
        assert_eq!(read_vault(&path).unwrap(), b"container bytes");
    }

    #[test]
    fn write_replaces_existing_file_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.vault");

        write_vault(&path, b"first").unwrap();
        write_vault(&path, b"second").unwrap();

        assert_eq!(read_vault(&path).unwrap(), b"second");
        assert!(!dir.path().join(".test.vault.tmp").exists());
    }

    #[test]
    fn write_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("dir").join("test.vault");

        write_vault(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn read_missing_file_is_vault_not_found() {
        let dir = TempDir::new().unwrap();
        let result = read_vault(&dir.path().join("missing.vault"));
        assert!(matches!(result, Err(LockboxError::VaultNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.vault");
        write_vault(&path, b"x").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
