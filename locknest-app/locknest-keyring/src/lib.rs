//! OS keyring backed secret storage.
//!
//! Secrets are stored per *alias* (the keyring account name) under a single
//! service name:
//! - **macOS**: Keychain Access
//! - **Windows**: Credential Manager
//! - **Linux**: Secret Service (GNOME Keyring, KWallet)

pub use models::*;

mod error;
mod models;
mod store;

pub use error::{Error, Result};
pub use store::SecretStore;
