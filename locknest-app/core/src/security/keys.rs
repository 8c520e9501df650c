//! Symmetric key management on top of a platform key store.
//!
//! Keys are 256-bit AES-GCM keys addressed by a fixed alias. The key store is
//! an explicit dependency of [`KeyManager`]; nothing here is process-global.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use locknest_keyring::SecretStore;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::random::SecureRandom;
use crate::error::{LockNestError, Result};

/// Key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Alias used for the backup encryption key.
pub const BACKUP_KEY_ALIAS: &str = "backup_encryption_key";

/// Protected storage for raw key material.
pub trait KeyStore: Send + Sync {
    /// Whether the backend can currently be used.
    fn is_available(&self) -> bool;

    /// Load the key stored under `alias`, if any.
    fn load(&self, alias: &str) -> Result<Option<Zeroizing<Vec<u8>>>>;

    /// Store `key` under `alias`, replacing any previous key.
    fn store(&self, alias: &str, key: &[u8]) -> Result<()>;

    /// Remove the key under `alias`. Idempotent.
    fn delete(&self, alias: &str) -> Result<()>;
}

/// Production key store backed by the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringKeyStore {
    secrets: SecretStore,
}

/// Alias only read to test keyring availability.
const AVAILABILITY_ALIAS: &str = "availability_check";

impl KeyringKeyStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            secrets: SecretStore::new(service),
        }
    }
}

impl KeyStore for KeyringKeyStore {
    fn is_available(&self) -> bool {
        let status = self.secrets.check_availability(AVAILABILITY_ALIAS);
        if let Some(reason) = &status.unavailable_reason {
            warn!("Key store unavailable: {}", reason);
        }
        status.available
    }

    fn load(&self, alias: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        Ok(self.secrets.retrieve_secret(alias)?.map(Zeroizing::new))
    }

    fn store(&self, alias: &str, key: &[u8]) -> Result<()> {
        Ok(self.secrets.store_secret(alias, key)?)
    }

    fn delete(&self, alias: &str) -> Result<()> {
        Ok(self.secrets.delete_secret(alias)?)
    }
}

/// In-memory key store for tests. Can be switched to "unavailable" to
/// exercise environment faults.
#[derive(Debug)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, Zeroizing<Vec<u8>>>>,
    available: AtomicBool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LockNestError::KeyStoreUnavailable(
                "memory key store disabled".into(),
            ))
        }
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for MemoryKeyStore {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn load(&self, alias: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        self.check()?;
        Ok(self.keys.lock().get(alias).cloned())
    }

    fn store(&self, alias: &str, key: &[u8]) -> Result<()> {
        self.check()?;
        self.keys
            .lock()
            .insert(alias.to_string(), Zeroizing::new(key.to_vec()));
        Ok(())
    }

    fn delete(&self, alias: &str) -> Result<()> {
        self.check()?;
        self.keys.lock().remove(alias);
        Ok(())
    }
}

/// A 256-bit key together with the alias it was loaded from.
///
/// The key material is erased from memory when the handle is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyHandle {
    alias: String,
    key: [u8; KEY_SIZE],
}

impl KeyHandle {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Raw key bytes for cipher construction.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    fn from_slice(alias: &str, slice: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = slice.try_into().map_err(|_| {
            LockNestError::KeyStoreUnavailable(format!(
                "Key '{}' has invalid length {} (expected {})",
                alias,
                slice.len(),
                KEY_SIZE
            ))
        })?;
        Ok(Self {
            alias: alias.to_string(),
            key,
        })
    }

    /// Build a handle from raw bytes without touching any key store.
    #[cfg(test)]
    pub(crate) fn for_tests(alias: &str, key: [u8; KEY_SIZE]) -> Self {
        Self {
            alias: alias.to_string(),
            key,
        }
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual key material
        f.debug_struct("KeyHandle")
            .field("alias", &self.alias)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Produces and retrieves AES-GCM keys from a [`KeyStore`].
///
/// Clones share one lock, so a key is created at most once per alias even
/// when several callers ask for it at the same time.
#[derive(Clone)]
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    lock: Arc<Mutex<()>>,
}

impl KeyManager {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    /// Return the key under `alias`, generating and storing a fresh one if
    /// none exists yet.
    pub fn get_or_create_key(&self, alias: &str) -> Result<KeyHandle> {
        let _guard = self.lock.lock();
        match self.store.load(alias).map_err(unavailable)? {
            Some(bytes) => {
                debug!("Loaded key '{}' from key store", alias);
                KeyHandle::from_slice(alias, &bytes)
            }
            None => {
                info!("No key under '{}', generating a new one", alias);
                self.generate_and_store(alias)
            }
        }
    }

    /// Replace the key under `alias`. Everything encrypted under the old key
    /// becomes undecryptable.
    pub fn regenerate_key(&self, alias: &str) -> Result<KeyHandle> {
        let _guard = self.lock.lock();
        warn!("Regenerating key '{}' - existing ciphertexts are invalidated", alias);
        self.generate_and_store(alias)
    }

    pub fn delete_key(&self, alias: &str) -> Result<()> {
        let _guard = self.lock.lock();
        info!("Deleting key '{}'", alias);
        self.store.delete(alias).map_err(unavailable)
    }

    fn generate_and_store(&self, alias: &str) -> Result<KeyHandle> {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        SecureRandom::os().fill_bytes(&mut key[..]);
        self.store.store(alias, &key[..]).map_err(unavailable)?;
        KeyHandle::from_slice(alias, &key[..])
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager").finish_non_exhaustive()
    }
}

/// Any key store fault is fatal for the crypto operation that needed the key.
fn unavailable(err: LockNestError) -> LockNestError {
    match err {
        LockNestError::KeyStoreUnavailable(_) => err,
        other => LockNestError::KeyStoreUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (Arc<MemoryKeyStore>, KeyManager) {
        let store = Arc::new(MemoryKeyStore::new());
        let manager = KeyManager::new(store.clone());
        (store, manager)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (_, keys) = manager();
        let first = keys.get_or_create_key(BACKUP_KEY_ALIAS).unwrap();
        let second = keys.get_or_create_key(BACKUP_KEY_ALIAS).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(first.alias(), BACKUP_KEY_ALIAS);
    }

    #[test]
    fn test_aliases_are_independent() {
        let (_, keys) = manager();
        let a = keys.get_or_create_key("a").unwrap();
        let b = keys.get_or_create_key("b").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_regenerate_replaces_key() {
        let (_, keys) = manager();
        let old = keys.get_or_create_key(BACKUP_KEY_ALIAS).unwrap();
        let new = keys.regenerate_key(BACKUP_KEY_ALIAS).unwrap();
        assert_ne!(old.as_bytes(), new.as_bytes());
        let loaded = keys.get_or_create_key(BACKUP_KEY_ALIAS).unwrap();
        assert_eq!(loaded.as_bytes(), new.as_bytes());
    }

    #[test]
    fn test_delete_then_create_gives_new_key() {
        let (_, keys) = manager();
        let old = keys.get_or_create_key("k").unwrap();
        keys.delete_key("k").unwrap();
        keys.delete_key("k").unwrap();
        let new = keys.get_or_create_key("k").unwrap();
        assert_ne!(old.as_bytes(), new.as_bytes());
    }

    #[test]
    fn test_unavailable_store_is_reported() {
        let (store, keys) = manager();
        store.set_available(false);
        assert!(!keys.is_available());
        assert!(matches!(
            keys.get_or_create_key(BACKUP_KEY_ALIAS),
            Err(LockNestError::KeyStoreUnavailable(_))
        ));
    }

    #[test]
    fn test_truncated_key_material_rejected() {
        let (store, keys) = manager();
        store.store("short", &[1, 2, 3]).unwrap();
        assert!(matches!(
            keys.get_or_create_key("short"),
            Err(LockNestError::KeyStoreUnavailable(_))
        ));
    }

    /// Key store whose reads are slow, like a keyring behind D-Bus.
    struct SlowKeyStore {
        inner: MemoryKeyStore,
    }

    impl KeyStore for SlowKeyStore {
        fn is_available(&self) -> bool {
            self.inner.is_available()
        }

        fn load(&self, alias: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
            std::thread::sleep(std::time::Duration::from_millis(50));
            self.inner.load(alias)
        }

        fn store(&self, alias: &str, key: &[u8]) -> Result<()> {
            self.inner.store(alias, key)
        }

        fn delete(&self, alias: &str) -> Result<()> {
            self.inner.delete(alias)
        }
    }

    #[test]
    fn test_concurrent_first_use_creates_one_key() {
        let store = Arc::new(SlowKeyStore {
            inner: MemoryKeyStore::new(),
        });
        let keys = KeyManager::new(store.clone());

        let handles: Vec<KeyHandle> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    let keys = keys.clone();
                    scope.spawn(move || keys.get_or_create_key(BACKUP_KEY_ALIAS).unwrap())
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let stored = store.inner.load(BACKUP_KEY_ALIAS).unwrap().unwrap();
        for handle in &handles {
            assert_eq!(&handle.as_bytes()[..], &stored[..]);
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let handle = KeyHandle::for_tests("k", [9u8; KEY_SIZE]);
        let printed = format!("{:?}", handle);
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("9, 9"));
    }
}
