//! PIN authentication: session state machine, re-verification gate,
//! biometric collaborator and auto-lock.

mod autolock;
mod biometric;
mod gate;
mod pin;
mod state;

pub use autolock::AutoLock;
pub use biometric::{Biometric, BiometricOutcome, NoBiometric, ScriptedBiometric};
pub use gate::{ReverificationGate, Reverified, SensitiveOperation};
pub use pin::{validate_new_pin, PinCheck, PinHasher, MAX_PIN_LENGTH, MIN_PIN_LENGTH, PIN_HASH_KEY};
pub use state::{AuthState, LaunchPrompt, PinAuthenticator};

#[cfg(test)]
pub(crate) use gate::token_for_tests;
