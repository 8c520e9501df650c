//! Error types for keyring secret storage.

use serde::{Deserialize, Serialize};

/// Result type alias for secret storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during secret storage operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum Error {
    /// Secure storage is not available on this platform/device.
    #[error("Secure storage not available: {0}")]
    NotAvailable(String),

    /// Access to secure storage was denied by the OS.
    #[error("Access denied to secure storage")]
    AccessDenied,

    /// Platform-specific internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error means the backend itself cannot be used.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::NotAvailable(_) | Error::AccessDenied)
    }
}
