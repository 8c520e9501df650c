//! Heuristic strength rating shown next to a secret while editing it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Strength {
    Weak,
    Fair,
    Good,
    Strong,
}

impl Strength {
    /// Fill ratio for a strength meter.
    pub fn score(self) -> f32 {
        match self {
            Strength::Weak => 0.25,
            Strength::Fair => 0.5,
            Strength::Good => 0.75,
            Strength::Strong => 1.0,
        }
    }
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strength::Weak => write!(f, "Weak"),
            Strength::Fair => write!(f, "Fair"),
            Strength::Good => write!(f, "Good"),
            Strength::Strong => write!(f, "Strong"),
        }
    }
}

/// Rate a secret by length, class variety and distinct characters.
pub fn estimate_strength(secret: &str) -> Strength {
    if secret.is_empty() {
        return Strength::Weak;
    }

    let length = secret.chars().count();
    let mut score = 0;
    if length >= 8 {
        score += 1;
    }
    if length >= 12 {
        score += 1;
    }
    if secret.chars().any(char::is_uppercase) {
        score += 1;
    }
    if secret.chars().any(char::is_lowercase) {
        score += 1;
    }
    if secret.chars().any(char::is_numeric) {
        score += 1;
    }
    if secret.chars().any(|c| !c.is_alphanumeric()) {
        score += 1;
    }
    if secret.chars().collect::<HashSet<_>>().len() >= 8 {
        score += 1;
    }

    match score {
        0..=2 => Strength::Weak,
        3..=4 => Strength::Fair,
        5..=6 => Strength::Good,
        _ => Strength::Strong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_weak() {
        assert_eq!(estimate_strength(""), Strength::Weak);
    }

    #[test]
    fn test_ratings() {
        assert_eq!(estimate_strength("abc"), Strength::Weak);
        assert_eq!(estimate_strength("abcdefgh"), Strength::Fair);
        assert_eq!(estimate_strength("Abcdefgh12"), Strength::Good);
        assert_eq!(estimate_strength("Abcdefgh12!?xyz"), Strength::Strong);
    }

    #[test]
    fn test_non_ascii_digits_count_as_digits() {
        assert_eq!(estimate_strength("Abcdefgh"), Strength::Fair);
        assert_eq!(estimate_strength("Abcdefg\u{0663}"), Strength::Good);
    }

    #[test]
    fn test_ordering_matches_meter() {
        assert!(Strength::Weak < Strength::Strong);
        assert!(Strength::Fair.score() < Strength::Good.score());
    }
}
