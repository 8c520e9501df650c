//! Error types for the LockNest security core.
//!
//! Every failure crossing the authentication boundary is one of these typed
//! variants. Messages for PIN and restore failures are deliberately generic;
//! the underlying cause is only available through `source()` for logging.

use thiserror::Error;

/// Errors that can occur in the security core.
#[derive(Error, Debug)]
pub enum LockNestError {
    /// The caller violated a precondition.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The PIN entered during setup is shorter than 4 digits.
    #[error("PIN must be at least 4 digits")]
    PinTooShort,

    /// The confirmation PIN differs from the first entry.
    #[error("PINs do not match")]
    PinMismatch,

    /// The submitted PIN does not match the stored hash.
    #[error("Incorrect PIN")]
    IncorrectPin,

    /// No PIN hash has been stored yet.
    #[error("No PIN set")]
    PinNotSet,

    /// A sensitive operation was attempted without a matching re-verification.
    #[error("PIN re-verification required")]
    ReverificationRequired,

    /// The platform key store cannot be used.
    #[error("Key store unavailable: {0}")]
    KeyStoreUnavailable(String),

    /// Authenticated decryption failed (wrong key, corruption or tampering).
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Producing an encrypted backup failed.
    #[error("Backup export failed")]
    ExportFailed(#[source] Box<LockNestError>),

    /// Restoring an encrypted backup failed.
    #[error("Restore failed")]
    ImportFailed(#[source] Box<LockNestError>),

    /// Argon2 hashing failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// An error occurred in the encryption layer.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Persistent storage is missing or malformed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, LockNestError>;

impl LockNestError {
    /// Stable machine-readable code for front-ends.
    pub fn code(&self) -> &'static str {
        match self {
            LockNestError::InvalidParameters(_) => "INVALID_PARAMETERS",
            LockNestError::PinTooShort => "PIN_TOO_SHORT",
            LockNestError::PinMismatch => "PIN_MISMATCH",
            LockNestError::IncorrectPin => "INCORRECT_PIN",
            LockNestError::PinNotSet => "PIN_NOT_SET",
            LockNestError::ReverificationRequired => "REVERIFICATION_REQUIRED",
            LockNestError::KeyStoreUnavailable(_) => "KEY_STORE_UNAVAILABLE",
            LockNestError::DecryptionFailed => "DECRYPTION_FAILED",
            LockNestError::ExportFailed(_) => "EXPORT_FAILED",
            LockNestError::ImportFailed(_) => "IMPORT_FAILED",
            LockNestError::KeyDerivation(_) => "KEY_DERIVATION_ERROR",
            LockNestError::Encryption(_) => "ENCRYPTION_ERROR",
            LockNestError::Storage(_) => "STORAGE_ERROR",
            LockNestError::NotFound(_) => "NOT_FOUND",
            LockNestError::Serialization(_) => "SERIALIZATION_ERROR",
            LockNestError::Io(_) => "IO_ERROR",
        }
    }

    /// Errors the user can fix by re-entering a PIN.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            LockNestError::PinTooShort | LockNestError::PinMismatch | LockNestError::IncorrectPin
        )
    }

    pub(crate) fn export_failed(err: LockNestError) -> Self {
        match err {
            // Environment faults stay visible as such
            LockNestError::KeyStoreUnavailable(_) | LockNestError::ExportFailed(_) => err,
            other => LockNestError::ExportFailed(Box::new(other)),
        }
    }

    pub(crate) fn import_failed(err: LockNestError) -> Self {
        match err {
            LockNestError::KeyStoreUnavailable(_) | LockNestError::ImportFailed(_) => err,
            other => LockNestError::ImportFailed(Box::new(other)),
        }
    }
}

impl From<locknest_keyring::Error> for LockNestError {
    fn from(err: locknest_keyring::Error) -> Self {
        if err.is_unavailable() {
            LockNestError::KeyStoreUnavailable(err.to_string())
        } else {
            LockNestError::Storage(format!("Keyring: {}", err))
        }
    }
}

impl serde::Serialize for LockNestError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("LockNestError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&LockNestError::IncorrectPin).unwrap();
        assert!(json.contains("INCORRECT_PIN"));
        assert!(json.contains("Incorrect PIN"));
    }

    #[test]
    fn test_import_failure_message_hides_cause() {
        let err = LockNestError::import_failed(LockNestError::DecryptionFailed);
        assert_eq!(err.to_string(), "Restore failed");
        assert!(err.source().is_some());
        assert_eq!(err.code(), "IMPORT_FAILED");
    }

    #[test]
    fn test_key_store_fault_is_not_wrapped() {
        let err = LockNestError::export_failed(LockNestError::KeyStoreUnavailable("down".into()));
        assert!(matches!(err, LockNestError::KeyStoreUnavailable(_)));
    }

    #[test]
    fn test_wrapping_is_not_nested_twice() {
        let once = LockNestError::import_failed(LockNestError::DecryptionFailed);
        let twice = LockNestError::import_failed(once);
        match twice {
            LockNestError::ImportFailed(inner) => {
                assert!(matches!(*inner, LockNestError::DecryptionFailed))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_correctable_class() {
        assert!(LockNestError::PinMismatch.is_user_correctable());
        assert!(!LockNestError::DecryptionFailed.is_user_correctable());
    }

    #[test]
    fn test_keyring_errors_map_by_availability() {
        let err: LockNestError = locknest_keyring::Error::AccessDenied.into();
        assert!(matches!(err, LockNestError::KeyStoreUnavailable(_)));
        let err: LockNestError = locknest_keyring::Error::Internal("x".into()).into();
        assert!(matches!(err, LockNestError::Storage(_)));
    }
}
