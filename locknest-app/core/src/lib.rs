//! Security core of the LockNest credential manager.
//!
//! - [`security`]: randomness, secret generation, key management, AES-GCM
//! - [`auth`]: PIN state machine, re-verification gate, biometric, auto-lock
//! - [`vault`]: credential entries and their stores
//! - [`backup`]: encrypted backup export/restore and reports
//! - [`storage`]: configuration, data paths, secure preferences

pub mod auth;
pub mod backup;
mod context;
pub mod error;
pub mod security;
pub mod storage;
pub mod vault;

pub use context::LockNest;
pub use error::{LockNestError, Result};
