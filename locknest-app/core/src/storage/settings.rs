//! Security feature toggles persisted in secure preferences.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::preferences::SecurePreferences;
use crate::error::{LockNestError, Result};

pub const BIOMETRIC_ENABLED_KEY: &str = "biometric_enabled";
pub const AUTO_LOCK_ENABLED_KEY: &str = "auto_lock_enabled";
pub const AUTO_LOCK_TIME_KEY: &str = "auto_lock_time";

/// Allowed auto-lock delays in minutes.
pub const AUTO_LOCK_MINUTES_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySettings {
    pub biometric_enabled: bool,
    pub auto_lock_enabled: bool,
    pub auto_lock_minutes: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            biometric_enabled: false,
            auto_lock_enabled: true,
            auto_lock_minutes: 5,
        }
    }
}

impl SecuritySettings {
    pub fn validate(&self) -> Result<()> {
        if !AUTO_LOCK_MINUTES_RANGE.contains(&self.auto_lock_minutes) {
            return Err(LockNestError::InvalidParameters(format!(
                "Auto-lock time must be between {} and {} minutes",
                AUTO_LOCK_MINUTES_RANGE.start(),
                AUTO_LOCK_MINUTES_RANGE.end()
            )));
        }
        Ok(())
    }

    /// Load settings; missing or unparsable values fall back to defaults.
    pub fn load(prefs: &dyn SecurePreferences) -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            biometric_enabled: parse_or(prefs.get(BIOMETRIC_ENABLED_KEY)?, defaults.biometric_enabled),
            auto_lock_enabled: parse_or(prefs.get(AUTO_LOCK_ENABLED_KEY)?, defaults.auto_lock_enabled),
            auto_lock_minutes: parse_or(prefs.get(AUTO_LOCK_TIME_KEY)?, defaults.auto_lock_minutes),
        };
        if settings.validate().is_err() {
            return Ok(Self {
                auto_lock_minutes: defaults.auto_lock_minutes,
                ..settings
            });
        }
        Ok(settings)
    }

    pub fn save(&self, prefs: &dyn SecurePreferences) -> Result<()> {
        self.validate()?;
        prefs.put(BIOMETRIC_ENABLED_KEY, &self.biometric_enabled.to_string())?;
        prefs.put(AUTO_LOCK_ENABLED_KEY, &self.auto_lock_enabled.to_string())?;
        prefs.put(AUTO_LOCK_TIME_KEY, &self.auto_lock_minutes.to_string())?;
        debug!("Saved security settings: {:?}", self);
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
