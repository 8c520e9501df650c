use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LockNestError, Result};
use crate::security::{GeneratorOptions, BACKUP_KEY_ALIAS};

/// Argon2id cost parameters for PIN hashing.
/// Defaults balance security and usability:
/// - Memory: 64 MB (strong resistance to GPU attacks)
/// - Time: 3 iterations
/// - Parallelism: 4 lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub backup_key_alias: String,
    pub preferences_key_alias: String,
    pub vault_key_alias: String,
    pub keyring_service: String,
    pub kdf: KdfConfig,
    pub generator: GeneratorOptions,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            backup_key_alias: BACKUP_KEY_ALIAS.to_string(),
            preferences_key_alias: "secure_prefs_master_key".to_string(),
            vault_key_alias: "vault_storage_key".to_string(),
            keyring_service: "com.locknest.keystore".to_string(),
            kdf: KdfConfig::default(),
            generator: GeneratorOptions::default(),
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, alias) in [
            ("backup_key_alias", &self.backup_key_alias),
            ("preferences_key_alias", &self.preferences_key_alias),
            ("vault_key_alias", &self.vault_key_alias),
        ] {
            if alias.trim().is_empty() {
                return Err(LockNestError::InvalidParameters(format!("{} is empty", name)));
            }
        }
        self.generator.validate()
    }
}

/// Load the configuration, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<CoreConfig> {
    if !path.exists() {
        return Ok(CoreConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: CoreConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &CoreConfig) -> Result<()> {
    config.validate()?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.backup_key_alias, "backup_encryption_key");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = CoreConfig::default();
        config.kdf.iterations = 5;
        config.generator.length = 24;
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "keyring_service": "custom" }"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.keyring_service, "custom");
        assert_eq!(config.kdf, KdfConfig::default());
    }

    #[test]
    fn test_invalid_generator_defaults_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "generator": { "length": 2 } }"#).unwrap();
        assert!(matches!(
            load_config(&path),
            Err(LockNestError::InvalidParameters(_))
        ));
    }
}
