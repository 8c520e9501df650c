//! Data types for keyring secret storage.

use serde::{Deserialize, Serialize};

/// The method used for secure secret storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretStorageMethod {
    /// macOS Keychain.
    MacOSKeychain,
    /// Windows Credential Manager.
    WindowsCredentialManager,
    /// Linux Secret Service (GNOME Keyring, KWallet).
    LinuxSecretService,
    /// Any other platform keyring.
    PlatformDefault,
}

/// Status of secure secret storage availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretStorageStatus {
    /// Whether secure storage is available and can be used.
    pub available: bool,
    /// The method that will be used (if available).
    pub method: Option<SecretStorageMethod>,
    /// Why secure storage is unavailable (if not available).
    pub unavailable_reason: Option<String>,
}

impl SecretStorageStatus {
    /// Create a status indicating secure storage is available.
    pub fn available(method: SecretStorageMethod) -> Self {
        Self {
            available: true,
            method: Some(method),
            unavailable_reason: None,
        }
    }

    /// Create a status indicating secure storage is unavailable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            method: None,
            unavailable_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_constructors() {
        let ok = SecretStorageStatus::available(SecretStorageMethod::LinuxSecretService);
        assert!(ok.available);
        assert_eq!(ok.method, Some(SecretStorageMethod::LinuxSecretService));
        assert!(ok.unavailable_reason.is_none());

        let down = SecretStorageStatus::unavailable("locked");
        assert!(!down.available);
        assert!(down.method.is_none());
        assert_eq!(down.unavailable_reason.as_deref(), Some("locked"));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_string(&SecretStorageStatus::unavailable("x")).unwrap();
        assert!(json.contains("unavailableReason"));
    }
}
