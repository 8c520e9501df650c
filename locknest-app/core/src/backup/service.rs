//! Encrypted vault backups.
//!
//! A backup is the JSON array of entries sealed by [`CipherEngine`] under the
//! backup key. Restoring upserts every entry by id; entries applied before a
//! failure stay applied.

use std::io::{Read, Write};
use std::sync::Arc;

use tracing::{info, warn};
use zeroize::Zeroizing;

use super::report::ReportSnapshot;
use crate::auth::{Reverified, SensitiveOperation};
use crate::error::{LockNestError, Result};
use crate::security::{CipherEngine, KeyManager};
use crate::vault::{CredentialEntry, VaultStore};

pub struct VaultBackupService {
    keys: KeyManager,
    cipher: CipherEngine,
    store: Arc<dyn VaultStore>,
    alias: String,
}

impl VaultBackupService {
    pub fn new(
        keys: KeyManager,
        cipher: CipherEngine,
        store: Arc<dyn VaultStore>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            cipher,
            store,
            alias: alias.into(),
        }
    }

    /// Serialize and encrypt `entries`.
    pub fn export_backup(&self, entries: &[CredentialEntry]) -> Result<Vec<u8>> {
        self.seal(entries).map_err(|e| {
            warn!("Backup export failed: {}", e);
            LockNestError::export_failed(e)
        })
    }

    /// Export every entry currently in the store.
    pub fn export_all(&self) -> Result<Vec<u8>> {
        let entries = self.store.list_all().map_err(LockNestError::export_failed)?;
        self.export_backup(&entries)
    }

    /// Export the whole store into `sink`. Returns the number of bytes written.
    pub fn write_backup(&self, mut sink: impl Write) -> Result<usize> {
        let bytes = self.export_all()?;
        sink.write_all(&bytes)
            .and_then(|()| sink.flush())
            .map_err(|e| LockNestError::export_failed(e.into()))?;
        Ok(bytes.len())
    }

    /// Decrypt `bytes` and upsert every contained entry.
    ///
    /// Each restored entry gets a fresh `updated_at`. Returns the entries as
    /// stored.
    pub fn import_backup(&self, bytes: &[u8]) -> Result<Vec<CredentialEntry>> {
        let entries = self.open(bytes).map_err(|e| {
            warn!("Backup restore failed: {}", e);
            LockNestError::import_failed(e)
        })?;

        let mut applied = Vec::with_capacity(entries.len());
        for mut entry in entries {
            entry.touch();
            self.store
                .insert_or_replace(entry.clone())
                .map_err(LockNestError::import_failed)?;
            applied.push(entry);
        }
        info!("Restored {} entries from backup", applied.len());
        Ok(applied)
    }

    pub fn read_backup(&self, mut source: impl Read) -> Result<Vec<CredentialEntry>> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| LockNestError::import_failed(e.into()))?;
        self.import_backup(&bytes)
    }

    /// Current entries grouped by category. Secrets are included only with a
    /// token for [`SensitiveOperation::RevealSecrets`].
    pub fn report_snapshot(&self, reveal: Option<&Reverified>) -> Result<ReportSnapshot> {
        if let Some(token) = reveal {
            token.require(SensitiveOperation::RevealSecrets)?;
        }
        let entries = self.store.list_all()?;
        Ok(ReportSnapshot::build(&entries, reveal.is_some()))
    }

    fn seal(&self, entries: &[CredentialEntry]) -> Result<Vec<u8>> {
        let plaintext = Zeroizing::new(serde_json::to_vec(entries)?);
        let key = self.keys.get_or_create_key(&self.alias)?;
        let encrypted = self.cipher.encrypt(&plaintext, &key)?;
        info!("Exported {} entries ({} bytes)", entries.len(), encrypted.len());
        Ok(encrypted)
    }

    fn open(&self, bytes: &[u8]) -> Result<Vec<CredentialEntry>> {
        let key = self.keys.get_or_create_key(&self.alias)?;
        let plaintext = Zeroizing::new(self.cipher.decrypt(bytes, &key)?);
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

impl std::fmt::Debug for VaultBackupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultBackupService")
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}
