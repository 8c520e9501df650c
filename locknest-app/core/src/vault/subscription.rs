//! Live snapshots of the entry list.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;

use super::entry::{Category, CredentialEntry};

/// Which entries a subscription follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryFilter {
    #[default]
    All,
    Category(Category),
}

impl EntryFilter {
    pub fn matches(&self, entry: &CredentialEntry) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::Category(category) => entry.category() == *category,
        }
    }

    pub(crate) fn apply(&self, entries: &[CredentialEntry]) -> Vec<CredentialEntry> {
        entries.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

/// A restartable sequence of entry-list snapshots, newest first.
///
/// Dropping a subscription and calling `subscribe` again starts over from
/// the current state.
pub struct EntrySubscription {
    rx: watch::Receiver<Arc<Vec<CredentialEntry>>>,
    filter: EntryFilter,
}

impl EntrySubscription {
    pub(crate) fn new(rx: watch::Receiver<Arc<Vec<CredentialEntry>>>, filter: EntryFilter) -> Self {
        Self { rx, filter }
    }

    pub fn filter(&self) -> EntryFilter {
        self.filter
    }

    /// The latest snapshot, marking it as seen.
    pub fn current(&mut self) -> Vec<CredentialEntry> {
        let snapshot = self.rx.borrow_and_update().clone();
        self.filter.apply(&snapshot)
    }

    /// Wait for the next change. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Vec<CredentialEntry>> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }

    /// Yield the current snapshot, then one snapshot per change.
    pub fn into_stream(mut self) -> impl Stream<Item = Vec<CredentialEntry>> {
        let first = self.current();
        futures::stream::unfold((Some(first), self), |(pending, mut sub)| async move {
            match pending {
                Some(snapshot) => Some((snapshot, (None, sub))),
                None => sub.changed().await.map(|snapshot| (snapshot, (None, sub))),
            }
        })
    }
}

impl std::fmt::Debug for EntrySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrySubscription")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
