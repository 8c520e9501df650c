//! Vault store interface and the shared in-memory table behind both
//! implementations.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::entry::{Category, CredentialEntry};
use super::subscription::{EntryFilter, EntrySubscription};
use crate::error::Result;

/// Persistent collection of credential entries.
pub trait VaultStore: Send + Sync {
    /// All entries, most recently updated first.
    fn list_all(&self) -> Result<Vec<CredentialEntry>>;

    fn get_by_id(&self, id: &str) -> Result<Option<CredentialEntry>>;

    /// Insert `entry`, replacing any stored entry with the same id.
    fn insert_or_replace(&self, entry: CredentialEntry) -> Result<()>;

    /// Remove `entry`. Unknown ids are ignored.
    fn delete(&self, entry: &CredentialEntry) -> Result<()>;

    fn subscribe(&self, filter: EntryFilter) -> EntrySubscription;

    /// Entries of one category, most recently updated first.
    fn list_by_category(&self, category: Category) -> Result<Vec<CredentialEntry>> {
        Ok(EntryFilter::Category(category).apply(&self.list_all()?))
    }

    /// Categories in use, in ascending name order.
    fn list_distinct_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.list_all()?.iter().map(|e| e.category()).collect();
        categories.sort_by_key(|c| c.as_str());
        categories.dedup();
        Ok(categories)
    }
}

/// Sort newest update first; ties broken by id so snapshots are stable.
pub(crate) fn sort_entries(entries: &mut [CredentialEntry]) {
    entries.sort_by(|a, b| {
        b.updated_at()
            .cmp(&a.updated_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Entries keyed by id plus a watch channel publishing sorted snapshots.
pub(crate) struct EntryTable {
    entries: RwLock<HashMap<String, CredentialEntry>>,
    feed: watch::Sender<Arc<Vec<CredentialEntry>>>,
}

impl EntryTable {
    pub(crate) fn new(initial: Vec<CredentialEntry>) -> Self {
        let entries: HashMap<String, CredentialEntry> = initial
            .into_iter()
            .map(|e| (e.id().to_string(), e))
            .collect();
        let (feed, _) = watch::channel(Arc::new(sorted(&entries)));
        Self {
            entries: RwLock::new(entries),
            feed,
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<CredentialEntry> {
        (**self.feed.borrow()).clone()
    }

    pub(crate) fn get(&self, id: &str) -> Option<CredentialEntry> {
        self.entries.read().get(id).cloned()
    }

    pub(crate) fn subscribe(&self, filter: EntryFilter) -> EntrySubscription {
        EntrySubscription::new(self.feed.subscribe(), filter)
    }

    /// Apply `change` to a copy of the table, hand the sorted result to
    /// `persist`, and only commit and publish if persisting succeeded.
    pub(crate) fn apply(
        &self,
        change: impl FnOnce(&mut HashMap<String, CredentialEntry>) -> bool,
        persist: impl FnOnce(&[CredentialEntry]) -> Result<()>,
    ) -> Result<()> {
        let mut guard = self.entries.write();
        let mut next = guard.clone();
        if !change(&mut next) {
            return Ok(());
        }
        let snapshot = sorted(&next);
        persist(&snapshot)?;
        *guard = next;
        self.feed.send_replace(Arc::new(snapshot));
        Ok(())
    }
}

fn sorted(entries: &HashMap<String, CredentialEntry>) -> Vec<CredentialEntry> {
    let mut list: Vec<CredentialEntry> = entries.values().cloned().collect();
    sort_entries(&mut list);
    list
}
