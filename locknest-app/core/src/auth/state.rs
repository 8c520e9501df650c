//! Primary session authentication state machine.
//!
//! ```text
//! Unauthenticated --launch--> AwaitingFirstTimeEntry   (no PIN stored)
//!                        \--> AwaitingPin              (PIN stored)
//! AwaitingFirstTimeEntry --valid PIN--> AwaitingFirstTimeConfirm
//! AwaitingFirstTimeConfirm --same PIN--> Authenticated (hash persisted)
//! AwaitingPin --correct PIN--> Authenticated
//! any --biometric success--> Authenticated
//! Authenticated --lock--> AwaitingPin
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::biometric::{Biometric, BiometricOutcome};
use super::gate::ReverificationGate;
use super::pin::{validate_new_pin, PinCheck, PinHasher, PIN_HASH_KEY};
use crate::error::{LockNestError, Result};
use crate::storage::{SecurePreferences, SecuritySettings};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AuthState {
    #[default]
    Unauthenticated,
    AwaitingFirstTimeEntry,
    AwaitingFirstTimeConfirm,
    AwaitingPin,
    Authenticated,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::AwaitingFirstTimeEntry => write!(f, "AwaitingFirstTimeEntry"),
            Self::AwaitingFirstTimeConfirm => write!(f, "AwaitingFirstTimeConfirm"),
            Self::AwaitingPin => write!(f, "AwaitingPin"),
            Self::Authenticated => write!(f, "Authenticated"),
        }
    }
}

/// What the front-end should show after [`PinAuthenticator::launch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchPrompt {
    FirstTimeSetup,
    Pin,
    /// PIN entry, with a biometric prompt offered first.
    PinOrBiometric,
}

/// Drives one authentication session. Calls are serialized through `&mut self`.
pub struct PinAuthenticator {
    prefs: Arc<dyn SecurePreferences>,
    biometric: Arc<dyn Biometric>,
    hasher: PinHasher,
    gate: ReverificationGate,
    state: AuthState,
    pending_pin: Option<Zeroizing<String>>,
}

impl PinAuthenticator {
    pub fn new(
        prefs: Arc<dyn SecurePreferences>,
        biometric: Arc<dyn Biometric>,
        hasher: PinHasher,
    ) -> Self {
        Self {
            gate: ReverificationGate::new(prefs.clone(), hasher),
            prefs,
            biometric,
            hasher,
            state: AuthState::Unauthenticated,
            pending_pin: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Re-verification gate sharing this session's preferences.
    pub fn gate(&self) -> &ReverificationGate {
        &self.gate
    }

    pub fn has_pin(&self) -> Result<bool> {
        self.prefs.contains(PIN_HASH_KEY)
    }

    /// Start a session from whatever is stored.
    pub fn launch(&mut self) -> Result<LaunchPrompt> {
        self.pending_pin = None;
        if !self.has_pin()? {
            self.transition(AuthState::AwaitingFirstTimeEntry);
            return Ok(LaunchPrompt::FirstTimeSetup);
        }

        self.transition(AuthState::AwaitingPin);
        let settings = SecuritySettings::load(self.prefs.as_ref())?;
        if settings.biometric_enabled && self.biometric.is_available() {
            Ok(LaunchPrompt::PinOrBiometric)
        } else {
            Ok(LaunchPrompt::Pin)
        }
    }

    /// Feed one PIN entry into the state machine.
    ///
    /// Errors leave the state unchanged except where noted.
    pub fn submit_pin(&mut self, pin: &str) -> Result<AuthState> {
        match self.state {
            AuthState::Unauthenticated => Err(LockNestError::InvalidParameters(
                "Authentication has not been launched".into(),
            )),
            AuthState::AwaitingFirstTimeEntry => {
                validate_new_pin(pin)?;
                self.pending_pin = Some(Zeroizing::new(pin.to_string()));
                Ok(self.transition(AuthState::AwaitingFirstTimeConfirm))
            }
            AuthState::AwaitingFirstTimeConfirm => self.confirm_first_pin(pin),
            AuthState::AwaitingPin => self.verify_pin(pin),
            AuthState::Authenticated => {
                debug!("PIN submitted while already authenticated");
                Ok(self.state)
            }
        }
    }

    /// Go back from confirmation to the first entry of a new PIN.
    pub fn restart_setup(&mut self) {
        if self.state == AuthState::AwaitingFirstTimeConfirm {
            self.pending_pin = None;
            self.transition(AuthState::AwaitingFirstTimeEntry);
        }
    }

    /// Show the biometric prompt and apply its outcome.
    pub fn attempt_biometric(&mut self) -> BiometricOutcome {
        if self.is_authenticated() {
            return BiometricOutcome::Success;
        }
        if !self.biometric.is_available() {
            return BiometricOutcome::Unavailable;
        }
        let outcome = self.biometric.prompt();
        self.on_biometric(&outcome);
        outcome
    }

    /// Apply a biometric result delivered by the platform.
    pub fn on_biometric(&mut self, outcome: &BiometricOutcome) {
        match outcome {
            BiometricOutcome::Success => {
                self.pending_pin = None;
                info!("Authenticated by biometric");
                self.transition(AuthState::Authenticated);
            }
            BiometricOutcome::Failure(reason) => warn!("Biometric prompt failed: {}", reason),
            BiometricOutcome::Unavailable => debug!("Biometric unavailable"),
        }
    }

    /// End the authenticated session.
    pub fn lock(&mut self) {
        if self.is_authenticated() {
            info!("Session locked");
            self.transition(AuthState::AwaitingPin);
        }
    }

    fn confirm_first_pin(&mut self, confirm: &str) -> Result<AuthState> {
        let matches = match &self.pending_pin {
            Some(pending) => bool::from(pending.as_bytes().ct_eq(confirm.as_bytes())),
            None => false,
        };
        if !matches {
            return Err(LockNestError::PinMismatch);
        }

        let hash = Zeroizing::new(self.hasher.hash(confirm)?);
        self.prefs.put(PIN_HASH_KEY, &hash)?;
        self.pending_pin = None;
        info!("PIN set up");
        Ok(self.transition(AuthState::Authenticated))
    }

    fn verify_pin(&mut self, pin: &str) -> Result<AuthState> {
        let Some(stored) = self.prefs.get(PIN_HASH_KEY)? else {
            warn!("PIN hash disappeared, restarting setup");
            self.transition(AuthState::AwaitingFirstTimeEntry);
            return Err(LockNestError::PinNotSet);
        };

        match self.hasher.verify(pin, &stored) {
            PinCheck::Match => {}
            PinCheck::MatchLegacy => self.upgrade_legacy_hash(pin),
            PinCheck::NoMatch => {
                debug!("Incorrect PIN entered");
                return Err(LockNestError::IncorrectPin);
            }
        }
        Ok(self.transition(AuthState::Authenticated))
    }

    fn upgrade_legacy_hash(&self, pin: &str) {
        let upgraded = self
            .hasher
            .hash(pin)
            .and_then(|hash| self.prefs.put(PIN_HASH_KEY, &Zeroizing::new(hash)));
        match upgraded {
            Ok(()) => info!("Upgraded legacy PIN hash to Argon2id"),
            // Sign-in still succeeds; the upgrade is retried next time
            Err(e) => warn!("Failed to upgrade legacy PIN hash: {}", e),
        }
    }

    fn transition(&mut self, next: AuthState) -> AuthState {
        if self.state != next {
            debug!("Auth state {} -> {}", self.state, next);
            self.state = next;
        }
        next
    }
}

impl std::fmt::Debug for PinAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinAuthenticator")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
