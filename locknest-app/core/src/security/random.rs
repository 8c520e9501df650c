//! Cryptographically secure randomness.
//!
//! Production code uses [`SecureRandom::os`], which draws every byte straight
//! from the operating system. [`SecureRandom::seeded`] is a deterministic
//! stand-in for tests only.

use rand::rngs::{OsRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng, TryRngCore};

use crate::error::{LockNestError, Result};

/// Source of random bytes and integers.
pub enum SecureRandom {
    /// Operating system entropy. Failure to read it aborts via panic since
    /// nothing in this crate can proceed safely without it.
    Os,
    /// Deterministic generator for tests. Not secure.
    Seeded(StdRng),
}

impl SecureRandom {
    /// OS-backed source.
    pub fn os() -> Self {
        SecureRandom::Os
    }

    /// Deterministic source for tests.
    pub fn seeded(seed: u64) -> Self {
        SecureRandom::Seeded(StdRng::seed_from_u64(seed))
    }

    fn with_rng<T>(&mut self, f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
        match self {
            SecureRandom::Os => {
                let mut rng = OsRng.unwrap_err();
                f(&mut rng)
            }
            SecureRandom::Seeded(rng) => f(rng),
        }
    }

    /// Uniform integer in `0..bound`.
    pub fn next_int(&mut self, bound: usize) -> Result<usize> {
        if bound == 0 {
            return Err(LockNestError::InvalidParameters(
                "Random bound must be positive".into(),
            ));
        }
        Ok(self.with_rng(|rng| rng.random_range(0..bound)))
    }

    /// `n` fresh random bytes.
    pub fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; n];
        self.fill_bytes(&mut bytes);
        bytes
    }

    pub fn fill_bytes(&mut self, buf: &mut [u8]) {
        self.with_rng(|rng| rng.fill_bytes(buf));
    }

    /// Uniform (Fisher-Yates) shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        self.with_rng(|rng| items.shuffle(rng));
    }
}

impl Default for SecureRandom {
    fn default() -> Self {
        Self::os()
    }
}

impl std::fmt::Debug for SecureRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecureRandom::Os => write!(f, "SecureRandom::Os"),
            SecureRandom::Seeded(_) => write!(f, "SecureRandom::Seeded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_int_stays_in_bounds() {
        let mut rng = SecureRandom::os();
        for _ in 0..1000 {
            assert!(rng.next_int(7).unwrap() < 7);
        }
    }

    #[test]
    fn test_next_int_zero_bound_rejected() {
        let mut rng = SecureRandom::os();
        assert!(matches!(
            rng.next_int(0),
            Err(LockNestError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_next_bytes_length_and_freshness() {
        let mut rng = SecureRandom::os();
        let a = rng.next_bytes(32);
        let b = rng.next_bytes(32);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b, "two 256-bit draws should never collide");
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = SecureRandom::seeded(42);
        let mut b = SecureRandom::seeded(42);
        assert_eq!(a.next_bytes(16), b.next_bytes(16));
        assert_eq!(a.next_int(1000).unwrap(), b.next_int(1000).unwrap());
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut rng = SecureRandom::os();
        let mut items: Vec<u32> = (0..50).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
