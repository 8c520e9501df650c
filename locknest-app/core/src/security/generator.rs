//! Random credential generation with character-class guarantees.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::random::SecureRandom;
use crate::error::{LockNestError, Result};

pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DIGITS: &str = "0123456789";
pub const SPECIAL: &str = "!@#$%^&*()-_=+[]{}|;:,.<>?/";

/// Shortest secret the generator will produce.
pub const MIN_LENGTH: usize = 4;

/// Which character classes to draw from and how long the result is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    pub length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub special: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 16,
            uppercase: true,
            lowercase: true,
            digits: true,
            special: true,
        }
    }
}

impl GeneratorOptions {
    /// Alphabets of the enabled classes, in fixed order.
    pub fn enabled_classes(&self) -> Vec<&'static str> {
        [
            (self.uppercase, UPPERCASE),
            (self.lowercase, LOWERCASE),
            (self.digits, DIGITS),
            (self.special, SPECIAL),
        ]
        .into_iter()
        .filter_map(|(enabled, alphabet)| enabled.then_some(alphabet))
        .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.length < MIN_LENGTH {
            return Err(LockNestError::InvalidParameters(format!(
                "Length must be at least {} characters",
                MIN_LENGTH
            )));
        }
        if self.enabled_classes().is_empty() {
            return Err(LockNestError::InvalidParameters(
                "At least one character class must be enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Produces random secrets. Each call draws fresh randomness; nothing is
/// retained between calls.
#[derive(Debug, Default)]
pub struct CredentialGenerator {
    rng: SecureRandom,
}

impl CredentialGenerator {
    pub fn new(rng: SecureRandom) -> Self {
        Self { rng }
    }

    /// Generate a secret of exactly `options.length` characters.
    ///
    /// One character from every enabled class is drawn first, the rest comes
    /// uniformly from the combined pool, and the whole string is shuffled.
    pub fn generate(&mut self, options: &GeneratorOptions) -> Result<String> {
        options.validate()?;

        let classes: Vec<Vec<char>> = options
            .enabled_classes()
            .into_iter()
            .map(|alphabet| alphabet.chars().collect())
            .collect();
        let pool: Vec<char> = classes.iter().flatten().copied().collect();

        let mut secret: Vec<char> = Vec::with_capacity(options.length);
        for class in &classes {
            secret.push(class[self.rng.next_int(class.len())?]);
        }
        while secret.len() < options.length {
            secret.push(pool[self.rng.next_int(pool.len())?]);
        }
        self.rng.shuffle(&mut secret);

        debug!(
            "Generated {}-character secret from {} classes",
            secret.len(),
            classes.len()
        );
        Ok(secret.into_iter().collect())
    }

    /// Convenience form taking the flags positionally.
    pub fn generate_with(
        &mut self,
        length: usize,
        uppercase: bool,
        lowercase: bool,
        digits: bool,
        special: bool,
    ) -> Result<String> {
        self.generate(&GeneratorOptions {
            length,
            uppercase,
            lowercase,
            digits,
            special,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_in(secret: &str, alphabet: &str) -> usize {
        secret.chars().filter(|c| alphabet.contains(*c)).count()
    }

    #[test]
    fn test_alphabets_are_disjoint() {
        for c in SPECIAL.chars() {
            assert!(!c.is_ascii_alphanumeric());
        }
    }

    #[test]
    fn test_every_flag_combination_respects_classes() {
        let mut generator = CredentialGenerator::default();
        for mask in 1u8..16 {
            for length in [4usize, 5, 12, 64] {
                let options = GeneratorOptions {
                    length,
                    uppercase: mask & 1 != 0,
                    lowercase: mask & 2 != 0,
                    digits: mask & 4 != 0,
                    special: mask & 8 != 0,
                };
                let secret = generator.generate(&options).unwrap();
                assert_eq!(secret.chars().count(), length);

                for (enabled, alphabet) in [
                    (options.uppercase, UPPERCASE),
                    (options.lowercase, LOWERCASE),
                    (options.digits, DIGITS),
                    (options.special, SPECIAL),
                ] {
                    if enabled {
                        assert!(count_in(&secret, alphabet) >= 1, "{secret} misses {alphabet}");
                    } else {
                        assert_eq!(count_in(&secret, alphabet), 0, "{secret} has {alphabet}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_length_below_minimum_rejected() {
        let mut generator = CredentialGenerator::default();
        let err = generator.generate_with(3, true, true, true, true).unwrap_err();
        assert!(matches!(err, LockNestError::InvalidParameters(_)));
    }

    #[test]
    fn test_no_class_rejected() {
        let mut generator = CredentialGenerator::default();
        let err = generator
            .generate_with(16, false, false, false, false)
            .unwrap_err();
        assert!(matches!(err, LockNestError::InvalidParameters(_)));
    }

    #[test]
    fn test_consecutive_outputs_differ() {
        let mut generator = CredentialGenerator::default();
        let options = GeneratorOptions::default();
        let a = generator.generate(&options).unwrap();
        let b = generator.generate(&options).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seeded_generator_is_deterministic() {
        let options = GeneratorOptions::default();
        let a = CredentialGenerator::new(SecureRandom::seeded(7))
            .generate(&options)
            .unwrap();
        let b = CredentialGenerator::new(SecureRandom::seeded(7))
            .generate(&options)
            .unwrap();
        assert_eq!(a, b);
    }
}
