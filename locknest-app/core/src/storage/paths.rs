//! On-disk layout of a LockNest data directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Encrypted vault file name
pub const VAULT_FILE_NAME: &str = "vault.enc";

/// Encrypted preferences file name
pub const PREFERENCES_FILE_NAME: &str = "secure_prefs.enc";

/// Plain (non-secret) configuration file name
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Paths inside one data directory. Passed explicitly to every component
/// that touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the data directory if needed.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        debug!("Data directory ready at {:?}", self.root);
        Ok(())
    }

    pub fn vault_path(&self) -> PathBuf {
        self.root.join(VAULT_FILE_NAME)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join(PREFERENCES_FILE_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }
}

/// Write `bytes` to `path` atomically (temp file, then rename) and restrict
/// permissions to the owner on Unix.
pub fn write_private_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&temp_path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(&temp_path, perms)?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_root() {
        let paths = DataPaths::new("/tmp/locknest");
        assert_eq!(paths.vault_path(), PathBuf::from("/tmp/locknest/vault.enc"));
        assert_eq!(
            paths.preferences_path(),
            PathBuf::from("/tmp/locknest/secure_prefs.enc")
        );
        assert_eq!(paths.config_path(), PathBuf::from("/tmp/locknest/config.json"));
    }

    #[test]
    fn test_write_private_file_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        write_private_file(&path, b"first").unwrap();
        write_private_file(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("file.bin.tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_ensure_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("a/b"));
        paths.ensure().unwrap();
        assert!(paths.root().is_dir());
    }
}
