//! PIN validation and one-way hashing.
//!
//! New hashes are Argon2id PHC strings with a random per-hash salt.
//! Hashes written by older installs are a bare hex SHA-256 digest of the PIN;
//! those still verify and are reported as needing an upgrade.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::{LockNestError, Result};
use crate::security::SecureRandom;
use crate::storage::KdfConfig;

/// Preference key holding the stored PIN hash.
pub const PIN_HASH_KEY: &str = "pin_hash";

pub const MIN_PIN_LENGTH: usize = 4;
pub const MAX_PIN_LENGTH: usize = 6;

const SALT_LEN: usize = 16;
const LEGACY_HASH_LEN: usize = 64;

/// Check a PIN chosen during setup or change.
pub fn validate_new_pin(pin: &str) -> Result<()> {
    if pin.len() < MIN_PIN_LENGTH {
        return Err(LockNestError::PinTooShort);
    }
    if pin.len() > MAX_PIN_LENGTH || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LockNestError::InvalidParameters(format!(
            "PIN must be {}-{} digits",
            MIN_PIN_LENGTH, MAX_PIN_LENGTH
        )));
    }
    Ok(())
}

/// Outcome of comparing a PIN against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCheck {
    Match,
    /// Correct PIN, but the stored hash uses the legacy format.
    MatchLegacy,
    NoMatch,
}

impl PinCheck {
    pub fn is_match(self) -> bool {
        !matches!(self, PinCheck::NoMatch)
    }
}

/// Hashes and verifies PINs. Stateless apart from its cost parameters, so it
/// can be cloned and used from several threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinHasher {
    kdf: KdfConfig,
}

impl PinHasher {
    pub fn new(kdf: KdfConfig) -> Self {
        Self { kdf }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.kdf.memory_kib,
            self.kdf.iterations,
            self.kdf.parallelism,
            None,
        )
        .map_err(|e| LockNestError::KeyDerivation(format!("Invalid Argon2 params: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `pin` into a PHC string.
    pub fn hash(&self, pin: &str) -> Result<String> {
        let salt_bytes = SecureRandom::os().next_bytes(SALT_LEN);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| LockNestError::KeyDerivation(format!("Invalid salt: {}", e)))?;
        let hash = self
            .argon2()?
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| LockNestError::KeyDerivation(e.to_string()))?;
        debug!("Hashed PIN with Argon2id (m={} KiB)", self.kdf.memory_kib);
        Ok(hash.to_string())
    }

    /// Compare `pin` with `stored`. A stored value in neither known format
    /// never matches.
    pub fn verify(&self, pin: &str, stored: &str) -> PinCheck {
        if is_legacy_hash(stored) {
            return if legacy_matches(pin, stored) {
                PinCheck::MatchLegacy
            } else {
                PinCheck::NoMatch
            };
        }

        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored PIN hash is malformed: {}", e);
                return PinCheck::NoMatch;
            }
        };
        // Cost parameters come from the PHC string itself
        match Argon2::default().verify_password(pin.as_bytes(), &parsed) {
            Ok(()) => PinCheck::Match,
            Err(_) => PinCheck::NoMatch,
        }
    }
}

fn is_legacy_hash(stored: &str) -> bool {
    stored.len() == LEGACY_HASH_LEN && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

fn legacy_matches(pin: &str, stored: &str) -> bool {
    let Ok(expected) = hex::decode(stored) else {
        return false;
    };
    let actual = Sha256::digest(pin.as_bytes());
    actual.as_slice().ct_eq(&expected).into()
}

#[cfg(test)]
pub(crate) fn legacy_hash(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()))
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> PinHasher {
    PinHasher::new(KdfConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_new_pin() {
        assert!(validate_new_pin("1234").is_ok());
        assert!(validate_new_pin("123456").is_ok());
        assert!(matches!(validate_new_pin("123"), Err(LockNestError::PinTooShort)));
        assert!(matches!(validate_new_pin(""), Err(LockNestError::PinTooShort)));
        assert!(matches!(
            validate_new_pin("1234567"),
            Err(LockNestError::InvalidParameters(_))
        ));
        assert!(matches!(
            validate_new_pin("12a4"),
            Err(LockNestError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let stored = hasher.hash("1234").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert_eq!(hasher.verify("1234", &stored), PinCheck::Match);
        assert_eq!(hasher.verify("9999", &stored), PinCheck::NoMatch);
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = fast_hasher();
        assert_ne!(hasher.hash("1234").unwrap(), hasher.hash("1234").unwrap());
    }

    #[test]
    fn test_verify_ignores_hasher_params() {
        let stored = fast_hasher().hash("2468").unwrap();
        let other = PinHasher::new(KdfConfig {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        });
        assert_eq!(other.verify("2468", &stored), PinCheck::Match);
    }

    #[test]
    fn test_legacy_digest() {
        let hasher = fast_hasher();
        let stored = legacy_hash("5150");
        assert_eq!(hasher.verify("5150", &stored), PinCheck::MatchLegacy);
        assert_eq!(hasher.verify("5151", &stored), PinCheck::NoMatch);
        assert_eq!(
            hasher.verify("5150", &stored.to_uppercase()),
            PinCheck::MatchLegacy
        );
    }

    #[test]
    fn test_garbage_never_matches() {
        let hasher = fast_hasher();
        assert_eq!(hasher.verify("1234", ""), PinCheck::NoMatch);
        assert_eq!(hasher.verify("1234", "1234"), PinCheck::NoMatch);
        assert_eq!(hasher.verify("1234", "$argon2id$broken"), PinCheck::NoMatch);
    }
}
