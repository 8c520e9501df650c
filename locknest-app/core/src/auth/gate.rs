//! PIN re-verification for sensitive operations.
//!
//! The gate checks a freshly entered PIN against the hash currently stored,
//! regardless of whether the session is authenticated, and hands out a
//! [`Reverified`] token scoped to one operation. It never touches session
//! state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::pin::{validate_new_pin, PinHasher, PIN_HASH_KEY};
use crate::error::{LockNestError, Result};
use crate::storage::SecurePreferences;

/// Operations that need a fresh PIN entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveOperation {
    ChangePin,
    /// Including plaintext secrets in an export or report.
    RevealSecrets,
}

/// Proof that the PIN was re-entered for a given operation.
///
/// Only [`ReverificationGate::reverify`] can create one.
#[derive(Debug, Clone)]
pub struct Reverified {
    purpose: SensitiveOperation,
    verified_at: DateTime<Utc>,
}

impl Reverified {
    pub fn purpose(&self) -> SensitiveOperation {
        self.purpose
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }

    /// Fail with `ReverificationRequired` unless issued for `purpose`.
    pub fn require(&self, purpose: SensitiveOperation) -> Result<()> {
        if self.purpose == purpose {
            Ok(())
        } else {
            Err(LockNestError::ReverificationRequired)
        }
    }
}

#[derive(Clone)]
pub struct ReverificationGate {
    prefs: Arc<dyn SecurePreferences>,
    hasher: PinHasher,
}

impl ReverificationGate {
    pub fn new(prefs: Arc<dyn SecurePreferences>, hasher: PinHasher) -> Self {
        Self { prefs, hasher }
    }

    /// Check `pin` against the stored hash for `purpose`.
    pub fn reverify(&self, purpose: SensitiveOperation, pin: &str) -> Result<Reverified> {
        let stored = self.prefs.get(PIN_HASH_KEY)?.ok_or(LockNestError::PinNotSet)?;
        if !self.hasher.verify(pin, &stored).is_match() {
            warn!("PIN re-verification failed for {:?}", purpose);
            return Err(LockNestError::IncorrectPin);
        }
        info!("PIN re-verified for {:?}", purpose);
        Ok(Reverified {
            purpose,
            verified_at: Utc::now(),
        })
    }

    /// Replace the stored PIN. The token is consumed.
    pub fn change_pin(&self, token: Reverified, new_pin: &str, confirm: &str) -> Result<()> {
        token.require(SensitiveOperation::ChangePin)?;
        validate_new_pin(new_pin)?;
        if !bool::from(new_pin.as_bytes().ct_eq(confirm.as_bytes())) {
            return Err(LockNestError::PinMismatch);
        }
        let hash = Zeroizing::new(self.hasher.hash(new_pin)?);
        self.prefs.put(PIN_HASH_KEY, &hash)?;
        info!("PIN changed");
        Ok(())
    }
}

impl std::fmt::Debug for ReverificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverificationGate")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

/// Token for tests that do not exercise the gate itself.
#[cfg(test)]
pub(crate) fn token_for_tests(purpose: SensitiveOperation) -> Reverified {
    Reverified {
        purpose,
        verified_at: Utc::now(),
    }
}
