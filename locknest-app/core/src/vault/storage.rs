//! Vault store persisted as an encrypted JSON file.
//!
//! The file holds the serialized entry list sealed with [`CipherEngine`]
//! under a key from the platform key store:
//! `[12-byte nonce][ciphertext with 16-byte auth tag]`.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::entry::CredentialEntry;
use super::store::{EntryTable, VaultStore};
use super::subscription::{EntryFilter, EntrySubscription};
use crate::error::{LockNestError, Result};
use crate::security::{CipherEngine, KeyManager};
use crate::storage::write_private_file;

/// File-backed vault store. Every mutation rewrites the whole file before it
/// becomes visible to readers.
pub struct EncryptedFileVaultStore {
    path: PathBuf,
    keys: KeyManager,
    alias: String,
    cipher: CipherEngine,
    table: EntryTable,
}

impl EncryptedFileVaultStore {
    /// Open the vault at `path`, creating an empty one if the file is absent.
    pub fn open(path: impl Into<PathBuf>, keys: KeyManager, alias: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let alias = alias.into();
        let cipher = CipherEngine::new();

        let entries = if path.exists() {
            let entries = read_vault(&path, &keys, &alias, &cipher)?;
            info!("Opened vault at {:?} with {} entries", path, entries.len());
            entries
        } else {
            info!("No vault at {:?}, starting empty", path);
            Vec::new()
        };

        Ok(Self {
            path,
            keys,
            alias,
            cipher,
            table: EntryTable::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_vault(&self, entries: &[CredentialEntry]) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(entries)?);
        let key = self.keys.get_or_create_key(&self.alias)?;
        let encrypted = self.cipher.encrypt(&plaintext, &key)?;
        write_private_file(&self.path, &encrypted)?;
        debug!("Vault written: {} entries, {} bytes", entries.len(), encrypted.len());
        Ok(())
    }
}

fn read_vault(
    path: &Path,
    keys: &KeyManager,
    alias: &str,
    cipher: &CipherEngine,
) -> Result<Vec<CredentialEntry>> {
    let encrypted = std::fs::read(path)?;
    let key = keys.get_or_create_key(alias)?;
    let plaintext = Zeroizing::new(cipher.decrypt(&encrypted, &key).map_err(|e| {
        warn!("Vault file {:?} cannot be decrypted", path);
        e
    })?);
    serde_json::from_slice(&plaintext)
        .map_err(|e| LockNestError::Storage(format!("Vault data corrupted: {}", e)))
}

impl VaultStore for EncryptedFileVaultStore {
    fn list_all(&self) -> Result<Vec<CredentialEntry>> {
        Ok(self.table.snapshot())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<CredentialEntry>> {
        Ok(self.table.get(id))
    }

    fn insert_or_replace(&self, entry: CredentialEntry) -> Result<()> {
        self.table.apply(
            |entries| {
                entries.insert(entry.id().to_string(), entry);
                true
            },
            |snapshot| self.write_vault(snapshot),
        )
    }

    fn delete(&self, entry: &CredentialEntry) -> Result<()> {
        self.table.apply(
            |entries| entries.remove(entry.id()).is_some(),
            |snapshot| self.write_vault(snapshot),
        )
    }

    fn subscribe(&self, filter: EntryFilter) -> EntrySubscription {
        self.table.subscribe(filter)
    }
}

impl std::fmt::Debug for EncryptedFileVaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileVaultStore")
            .field("path", &self.path)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::MemoryKeyStore;
    use crate::vault::entry::{Category, EntryFields};
    use std::sync::Arc;

    const ALIAS: &str = "vault_storage_key";

    fn keys() -> (Arc<MemoryKeyStore>, KeyManager) {
        let store = Arc::new(MemoryKeyStore::new());
        (store.clone(), KeyManager::new(store))
    }

    fn entry(title: &str) -> CredentialEntry {
        CredentialEntry::new(EntryFields::new(title, "alice", "s3cret!").with_category(Category::Work))
            .unwrap()
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.enc");
        let (_, keys) = keys();

        let store = EncryptedFileVaultStore::open(&path, keys.clone(), ALIAS).unwrap();
        let e = entry("Bank");
        store.insert_or_replace(e.clone()).unwrap();
        drop(store);

        let reopened = EncryptedFileVaultStore::open(&path, keys, ALIAS).unwrap();
        assert_eq!(reopened.list_all().unwrap(), vec![e]);
    }

    #[test]
    fn test_file_does_not_contain_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.enc");
        let (_, keys) = keys();

        let store = EncryptedFileVaultStore::open(&path, keys, ALIAS).unwrap();
        store.insert_or_replace(entry("Bank")).unwrap();

        let raw = std::fs::read(&path).unwrap();
        let needle = b"s3cret!";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_wrong_key_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.enc");
        let (_, keys) = keys();

        let store = EncryptedFileVaultStore::open(&path, keys.clone(), ALIAS).unwrap();
        store.insert_or_replace(entry("Bank")).unwrap();
        keys.regenerate_key(ALIAS).unwrap();

        assert!(matches!(
            EncryptedFileVaultStore::open(&path, keys, ALIAS),
            Err(LockNestError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.enc");
        let (key_store, keys) = keys();

        let store = EncryptedFileVaultStore::open(&path, keys, ALIAS).unwrap();
        let first = entry("first");
        store.insert_or_replace(first.clone()).unwrap();

        key_store.set_available(false);
        assert!(matches!(
            store.insert_or_replace(entry("second")),
            Err(LockNestError::KeyStoreUnavailable(_))
        ));
        assert_eq!(store.list_all().unwrap(), vec![first]);
    }
}
