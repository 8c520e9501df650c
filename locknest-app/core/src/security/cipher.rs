//! Authenticated encryption of byte payloads with AES-256-GCM.
//!
//! Wire format: `[12-byte nonce][ciphertext with 16-byte auth tag]`.
//! Every call to [`CipherEngine::encrypt`] draws a fresh random nonce, and
//! the nonce travels with the ciphertext so decryption never depends on
//! cipher state from the encrypting call.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use tracing::debug;

use super::keys::KeyHandle;
use super::random::SecureRandom;
use crate::error::{LockNestError, Result};

/// Nonce size for AES-GCM (96 bits = 12 bytes)
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size.
pub const TAG_SIZE: usize = 16;

/// Stateless AES-256-GCM engine. Safe to share between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherEngine;

impl CipherEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn encrypt(&self, plaintext: &[u8], key: &KeyHandle) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| LockNestError::Encryption(format!("Invalid key: {}", e)))?;

        // Generate random nonce
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        SecureRandom::os().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| LockNestError::Encryption(format!("Encryption failed: {}", e)))?;

        // Prepend nonce to ciphertext
        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend(ciphertext);

        debug!(
            "Encrypted {} bytes under key '{}'",
            plaintext.len(),
            key.alias()
        );
        Ok(output)
    }

    /// Decrypt a payload produced by [`CipherEngine::encrypt`].
    ///
    /// Any failure (truncated input, wrong key, modified bytes) is reported as
    /// [`LockNestError::DecryptionFailed`] without further detail.
    pub fn decrypt(&self, encrypted: &[u8], key: &KeyHandle) -> Result<Vec<u8>> {
        if encrypted.len() < NONCE_SIZE + TAG_SIZE {
            debug!("Ciphertext too short ({} bytes)", encrypted.len());
            return Err(LockNestError::DecryptionFailed);
        }

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| LockNestError::Encryption(format!("Invalid key: {}", e)))?;

        // Extract nonce and ciphertext
        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| LockNestError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::keys::KEY_SIZE;

    fn key(byte: u8) -> KeyHandle {
        KeyHandle::for_tests("test", [byte; KEY_SIZE])
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        let engine = CipherEngine::new();
        let k = key(1);
        for size in [0usize, 1, 15, 16, 17, 4096] {
            let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let sealed = engine.encrypt(&payload, &k).unwrap();
            assert_eq!(sealed.len(), NONCE_SIZE + size + TAG_SIZE);
            assert_eq!(engine.decrypt(&sealed, &k).unwrap(), payload);
        }
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let engine = CipherEngine::new();
        let k = key(1);
        let a = engine.encrypt(b"same", &k).unwrap();
        let b = engine.encrypt(b"same", &k).unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let engine = CipherEngine::new();
        let sealed = engine.encrypt(b"secret", &key(1)).unwrap();
        assert!(matches!(
            engine.decrypt(&sealed, &key(2)),
            Err(LockNestError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampering_detected_anywhere() {
        let engine = CipherEngine::new();
        let k = key(3);
        let sealed = engine.encrypt(b"important payload", &k).unwrap();
        for index in [0, NONCE_SIZE, sealed.len() - 1] {
            let mut tampered = sealed.clone();
            tampered[index] ^= 0x01;
            assert!(matches!(
                engine.decrypt(&tampered, &k),
                Err(LockNestError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn test_truncated_input_fails() {
        let engine = CipherEngine::new();
        let k = key(4);
        assert!(matches!(
            engine.decrypt(&[0u8; NONCE_SIZE + TAG_SIZE - 1], &k),
            Err(LockNestError::DecryptionFailed)
        ));
        assert!(matches!(
            engine.decrypt(&[], &k),
            Err(LockNestError::DecryptionFailed)
        ));
    }
}
