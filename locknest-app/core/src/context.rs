//! Wiring of the security core for one data directory.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::auth::{Biometric, PinAuthenticator, PinHasher, ReverificationGate};
use crate::backup::VaultBackupService;
use crate::error::Result;
use crate::security::{CipherEngine, CredentialGenerator, KeyManager, KeyStore, SecureRandom};
use crate::storage::{
    CoreConfig, DataPaths, EncryptedFilePreferences, SecurePreferences, SecuritySettings,
};
use crate::vault::{EncryptedFileVaultStore, VaultStore};

/// Every component of the core, built once from explicit dependencies.
pub struct LockNest {
    pub config: CoreConfig,
    pub paths: DataPaths,
    pub keys: KeyManager,
    pub prefs: Arc<dyn SecurePreferences>,
    pub vault: Arc<dyn VaultStore>,
    pub backup: VaultBackupService,
    pub generator: Mutex<CredentialGenerator>,
}

impl LockNest {
    /// Open (or initialize) the data directory using `key_store` for keys.
    pub fn open(paths: DataPaths, config: CoreConfig, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        config.validate()?;
        paths.ensure()?;

        let keys = KeyManager::new(key_store);
        let prefs: Arc<dyn SecurePreferences> = Arc::new(EncryptedFilePreferences::new(
            paths.preferences_path(),
            keys.clone(),
            config.preferences_key_alias.clone(),
        ));
        let vault: Arc<dyn VaultStore> = Arc::new(EncryptedFileVaultStore::open(
            paths.vault_path(),
            keys.clone(),
            config.vault_key_alias.clone(),
        )?);
        let backup = VaultBackupService::new(
            keys.clone(),
            CipherEngine::new(),
            vault.clone(),
            config.backup_key_alias.clone(),
        );

        info!("LockNest core opened at {:?}", paths.root());
        Ok(Self {
            generator: Mutex::new(CredentialGenerator::new(SecureRandom::os())),
            config,
            paths,
            keys,
            prefs,
            vault,
            backup,
        })
    }

    pub fn hasher(&self) -> PinHasher {
        PinHasher::new(self.config.kdf)
    }

    /// A fresh authentication session.
    pub fn authenticator(&self, biometric: Arc<dyn Biometric>) -> PinAuthenticator {
        PinAuthenticator::new(self.prefs.clone(), biometric, self.hasher())
    }

    pub fn gate(&self) -> ReverificationGate {
        ReverificationGate::new(self.prefs.clone(), self.hasher())
    }

    pub fn settings(&self) -> Result<SecuritySettings> {
        SecuritySettings::load(self.prefs.as_ref())
    }

    pub fn save_settings(&self, settings: &SecuritySettings) -> Result<()> {
        settings.save(self.prefs.as_ref())
    }

    /// Generate a secret with the configured default options.
    pub fn generate_secret(&self) -> Result<String> {
        self.generator.lock().generate(&self.config.generator)
    }
}

impl std::fmt::Debug for LockNest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockNest")
            .field("paths", &self.paths)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
