mod config;
mod paths;
mod preferences;
mod settings;

pub use config::{load_config, save_config, CoreConfig, KdfConfig};
pub use paths::{write_private_file, DataPaths, CONFIG_FILE_NAME, PREFERENCES_FILE_NAME, VAULT_FILE_NAME};
pub use preferences::{EncryptedFilePreferences, MemoryPreferences, SecurePreferences};
pub use settings::{
    SecuritySettings, AUTO_LOCK_ENABLED_KEY, AUTO_LOCK_MINUTES_RANGE, AUTO_LOCK_TIME_KEY,
    BIOMETRIC_ENABLED_KEY,
};
