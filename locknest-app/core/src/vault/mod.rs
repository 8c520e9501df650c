//! Credential entries and the stores that hold them.

mod entry;
mod memory;
mod storage;
mod store;
mod subscription;

pub use entry::{Category, CredentialEntry, EntryFields};
pub use memory::MemoryVaultStore;
pub use storage::EncryptedFileVaultStore;
pub use store::VaultStore;
pub use subscription::{EntryFilter, EntrySubscription};
