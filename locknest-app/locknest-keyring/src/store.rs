//! Secret storage on top of the `keyring` crate.

use keyring::Entry;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::models::*;

/// Keyring-backed storage for binary secrets, one keyring entry per alias.
#[derive(Debug, Clone)]
pub struct SecretStore {
    service: String,
}

impl SecretStore {
    /// Create a store whose entries live under `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The keyring service name entries are stored under.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Check whether the keyring can be used for `alias`.
    pub fn check_availability(&self, alias: &str) -> SecretStorageStatus {
        debug!("Checking keyring availability for service: {}", self.service);

        let entry = match Entry::new(&self.service, alias) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Keyring not available: {}", e);
                return SecretStorageStatus::unavailable(format!("OS keyring not available: {}", e));
            }
        };
        let method = Self::get_platform_method();
        match entry.get_password() {
            Ok(_) => {
                debug!("Keyring available (entry exists), method: {:?}", method);
                SecretStorageStatus::available(method)
            }
            Err(keyring::Error::NoEntry) => {
                debug!("Keyring available (no entry yet), method: {:?}", method);
                SecretStorageStatus::available(method)
            }
            Err(e) => {
                warn!("Keyring not accessible: {:?}", e);
                SecretStorageStatus::unavailable(format!("OS keyring not accessible: {}", e))
            }
        }
    }

    /// Store a secret under `alias`, replacing any previous value.
    ///
    /// The secret is stored as base64 (keyring APIs expect strings) and read
    /// back through a fresh entry to confirm it actually landed.
    pub fn store_secret(&self, alias: &str, secret: &[u8]) -> crate::Result<()> {
        info!(
            "Storing {} byte secret in keyring (service: {}, alias: {})",
            secret.len(),
            self.service,
            alias
        );

        let entry = self.entry(alias)?;
        let encoded = base64_encode(secret);

        if let Err(e) = entry.set_password(&encoded) {
            error!("Failed to store secret in keyring: {:?}", e);
            return Err(Self::map_keyring_error(e));
        }

        let verify_entry = self.entry(alias)?;
        match verify_entry.get_password() {
            Ok(readback) if readback == encoded => {
                debug!("Secret verified after store");
                Ok(())
            }
            Ok(_) => {
                error!("Secret verification failed - stored data doesn't match");
                Err(Error::Internal("Keyring verification failed: data mismatch".into()))
            }
            Err(e) => {
                error!("Secret verification failed - cannot read back: {:?}", e);
                Err(Error::Internal(format!(
                    "Keyring verification failed: stored value not readable: {:?}",
                    e
                )))
            }
        }
    }

    /// Retrieve the secret stored under `alias`.
    ///
    /// Returns `Ok(None)` when no secret has been stored yet.
    pub fn retrieve_secret(&self, alias: &str) -> crate::Result<Option<Vec<u8>>> {
        debug!(
            "Retrieving secret from keyring (service: {}, alias: {})",
            self.service, alias
        );

        let entry = self.entry(alias)?;
        let encoded = match entry.get_password() {
            Ok(password) => password,
            Err(keyring::Error::NoEntry) => {
                debug!("No secret stored under alias {}", alias);
                return Ok(None);
            }
            Err(e) => {
                error!("Failed to retrieve secret from keyring: {:?}", e);
                return Err(Self::map_keyring_error(e));
            }
        };

        let secret = base64_decode(&encoded).map_err(|e| {
            error!("Failed to decode secret from base64: {}", e);
            Error::Internal(format!("Failed to decode secret: {}", e))
        })?;

        debug!("Retrieved {} byte secret from keyring", secret.len());
        Ok(Some(secret))
    }

    /// Delete the secret stored under `alias`. Idempotent.
    pub fn delete_secret(&self, alias: &str) -> crate::Result<()> {
        let entry = self.entry(alias)?;

        match entry.delete_credential() {
            Ok(()) => {
                info!("Secret {} deleted from OS keyring", alias);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No secret to delete (already gone)");
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete secret from keyring: {:?}", e);
                Err(Self::map_keyring_error(e))
            }
        }
    }

    fn entry(&self, alias: &str) -> crate::Result<Entry> {
        Entry::new(&self.service, alias).map_err(|e| {
            error!("Failed to create keyring entry: {}", e);
            Self::map_keyring_error(e)
        })
    }

    /// Get the appropriate storage method for the current platform.
    fn get_platform_method() -> SecretStorageMethod {
        #[cfg(target_os = "macos")]
        {
            SecretStorageMethod::MacOSKeychain
        }
        #[cfg(target_os = "windows")]
        {
            SecretStorageMethod::WindowsCredentialManager
        }
        #[cfg(target_os = "linux")]
        {
            SecretStorageMethod::LinuxSecretService
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            SecretStorageMethod::PlatformDefault
        }
    }

    /// Map keyring errors to our error type.
    fn map_keyring_error(err: keyring::Error) -> Error {
        match err {
            keyring::Error::NoEntry => Error::Internal("Keyring entry vanished".into()),
            keyring::Error::Ambiguous(_) => Error::Internal("Multiple keyring entries found".into()),
            keyring::Error::NoStorageAccess(e) => {
                warn!("Keyring refused access: {:?}", e);
                Error::AccessDenied
            }
            keyring::Error::PlatformFailure(e) => {
                Error::NotAvailable(format!("Keyring platform failure: {:?}", e))
            }
            keyring::Error::BadEncoding(_) => Error::Internal("Keyring encoding error".into()),
            _ => Error::Internal(format!("Keyring error: {}", err)),
        }
    }
}

/// Base64 encode bytes to string.
fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Base64 decode string to bytes.
fn base64_decode(encoded: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip_binary() {
        let secret = [0u8, 255, 7, 42, 128];
        let encoded = base64_encode(&secret);
        assert_eq!(base64_decode(&encoded).unwrap(), secret.to_vec());
    }

    #[test]
    fn test_base64_decode_rejects_garbage() {
        assert!(base64_decode("not base64 !!").is_err());
    }

    #[test]
    fn test_locked_keyring_maps_to_access_denied() {
        let locked = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "collection locked");
        let err = SecretStore::map_keyring_error(keyring::Error::NoStorageAccess(Box::new(locked)));
        assert!(matches!(err, Error::AccessDenied));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_stray_no_entry_is_internal() {
        let err = SecretStore::map_keyring_error(keyring::Error::NoEntry);
        assert!(matches!(err, Error::Internal(_)));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_service_name_is_kept() {
        let store = SecretStore::new("com.locknest.test");
        assert_eq!(store.service(), "com.locknest.test");
    }
}
