//! In-memory vault store used by tests and ephemeral sessions.

use super::entry::CredentialEntry;
use super::store::{EntryTable, VaultStore};
use super::subscription::{EntryFilter, EntrySubscription};
use crate::error::Result;

/// Vault store that keeps entries only in process memory.
pub struct MemoryVaultStore {
    table: EntryTable,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    pub fn with_entries(entries: Vec<CredentialEntry>) -> Self {
        Self {
            table: EntryTable::new(entries),
        }
    }
}

impl Default for MemoryVaultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultStore for MemoryVaultStore {
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
            |_| Ok(()),
        )
    }

    fn delete(&self, entry: &CredentialEntry) -> Result<()> {
        self.table
            .apply(|entries| entries.remove(entry.id()).is_some(), |_| Ok(()))
    }

    fn subscribe(&self, filter: EntryFilter) -> EntrySubscription {
        self.table.subscribe(filter)
    }
}
