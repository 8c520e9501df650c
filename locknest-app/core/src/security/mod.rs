//! Cryptographic building blocks: randomness, secret generation, keys and
//! authenticated encryption.

mod cipher;
mod generator;
mod keys;
mod random;
mod strength;

pub use cipher::{CipherEngine, NONCE_SIZE, TAG_SIZE};
pub use generator::{
    CredentialGenerator, GeneratorOptions, DIGITS, LOWERCASE, MIN_LENGTH, SPECIAL, UPPERCASE,
};
pub use keys::{
    KeyHandle, KeyManager, KeyStore, KeyringKeyStore, MemoryKeyStore, BACKUP_KEY_ALIAS, KEY_SIZE,
};
pub use random::SecureRandom;
pub use strength::{estimate_strength, Strength};
