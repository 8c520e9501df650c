//! Protected key-value preferences (PIN hash and feature toggles).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use super::paths::write_private_file;
use crate::error::{LockNestError, Result};
use crate::security::{CipherEngine, KeyManager};

/// String key-value store whose contents are protected at rest.
pub trait SecurePreferences: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory preferences for tests.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecurePreferences for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Preferences stored as a JSON map, encrypted with a key from the key store.
///
/// Format on disk is the [`CipherEngine`] wire format of the serialized map.
pub struct EncryptedFilePreferences {
    path: PathBuf,
    keys: KeyManager,
    alias: String,
    cipher: CipherEngine,
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl EncryptedFilePreferences {
    pub fn new(path: impl Into<PathBuf>, keys: KeyManager, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            keys,
            alias: alias.into(),
            cipher: CipherEngine::new(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let encrypted = std::fs::read(&self.path)?;
        let key = self.keys.get_or_create_key(&self.alias)?;
        let plaintext = Zeroizing::new(self.cipher.decrypt(&encrypted, &key).map_err(|_| {
            LockNestError::Storage("Preferences file cannot be decrypted".into())
        })?);
        let map = serde_json::from_slice(&plaintext)
            .map_err(|e| LockNestError::Storage(format!("Preferences corrupted: {}", e)))?;
        Ok(map)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(map)?);
        let key = self.keys.get_or_create_key(&self.alias)?;
        let encrypted = self.cipher.encrypt(&plaintext, &key)?;
        write_private_file(&self.path, &encrypted)?;
        debug!("Wrote {} preferences to {:?}", map.len(), self.path);
        Ok(())
    }
}

impl SecurePreferences for EncryptedFilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
