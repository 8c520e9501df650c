//! Idle timeout that ends an authenticated session.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::state::PinAuthenticator;
use crate::storage::SecuritySettings;

#[derive(Debug, Clone)]
pub struct AutoLock {
    enabled: bool,
    timeout: Duration,
    last_activity: DateTime<Utc>,
}

impl AutoLock {
    pub fn new(settings: &SecuritySettings, now: DateTime<Utc>) -> Self {
        Self {
            enabled: settings.auto_lock_enabled,
            timeout: Duration::minutes(i64::from(settings.auto_lock_minutes)),
            last_activity: now,
        }
    }

    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity = self.last_activity.max(now);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn should_lock(&self, now: DateTime<Utc>) -> bool {
        self.enabled && now - self.last_activity >= self.timeout
    }

    /// Lock `auth` if the idle timeout has passed. Returns whether it locked.
    pub fn enforce(&self, auth: &mut PinAuthenticator, now: DateTime<Utc>) -> bool {
        if !auth.is_authenticated() || !self.should_lock(now) {
            return false;
        }
        info!(
            "Idle for {} minutes, locking",
            (now - self.last_activity).num_minutes()
        );
        auth.lock();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::biometric::NoBiometric;
    use crate::auth::pin::{fast_hasher, PIN_HASH_KEY};
    use crate::auth::state::AuthState;
    use crate::storage::{MemoryPreferences, SecurePreferences};
    use std::sync::Arc;

    fn settings(enabled: bool, minutes: u32) -> SecuritySettings {
        SecuritySettings {
            auto_lock_enabled: enabled,
            auto_lock_minutes: minutes,
            ..SecuritySettings::default()
        }
    }

    #[test]
    fn test_should_lock_after_timeout() {
        let start = Utc::now();
        let mut lock = AutoLock::new(&settings(true, 5), start);
        assert!(!lock.should_lock(start + Duration::minutes(4)));
        assert!(lock.should_lock(start + Duration::minutes(5)));

        lock.record_activity(start + Duration::minutes(4));
        assert!(!lock.should_lock(start + Duration::minutes(8)));
    }

    #[test]
    fn test_disabled_never_locks() {
        let start = Utc::now();
        let lock = AutoLock::new(&settings(false, 1), start);
        assert!(!lock.should_lock(start + Duration::days(1)));
    }

    #[test]
    fn test_activity_never_moves_backwards() {
        let start = Utc::now();
        let mut lock = AutoLock::new(&settings(true, 5), start);
        lock.record_activity(start - Duration::minutes(10));
        assert_eq!(lock.last_activity(), start);
    }

    #[test]
    fn test_enforce_locks_session() {
        let prefs = Arc::new(MemoryPreferences::new());
        prefs
            .put(PIN_HASH_KEY, &fast_hasher().hash("1234").unwrap())
            .unwrap();
        let mut auth = PinAuthenticator::new(prefs, Arc::new(NoBiometric), fast_hasher());
        auth.launch().unwrap();
        auth.submit_pin("1234").unwrap();

        let start = Utc::now();
        let lock = AutoLock::new(&settings(true, 1), start);
        assert!(!lock.enforce(&mut auth, start));
        assert!(lock.enforce(&mut auth, start + Duration::minutes(2)));
        assert_eq!(auth.state(), AuthState::AwaitingPin);
        assert!(!lock.enforce(&mut auth, start + Duration::minutes(3)));
    }
}
