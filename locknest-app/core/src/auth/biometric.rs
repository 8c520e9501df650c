//! Biometric prompt collaborator.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Result of a biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "reason", rename_all = "snake_case")]
pub enum BiometricOutcome {
    Success,
    Failure(String),
    Unavailable,
}

/// Platform biometric prompt. Timeouts are the implementation's concern.
pub trait Biometric: Send + Sync {
    fn is_available(&self) -> bool;
    fn prompt(&self) -> BiometricOutcome;
}

/// For hosts without biometric hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiometric;

impl Biometric for NoBiometric {
    fn is_available(&self) -> bool {
        false
    }

    fn prompt(&self) -> BiometricOutcome {
        BiometricOutcome::Unavailable
    }
}

/// Test double that replays queued outcomes in order.
///
/// When the queue is empty, prompts fail.
#[derive(Debug, Default)]
pub struct ScriptedBiometric {
    available: AtomicBool,
    outcomes: Mutex<VecDeque<BiometricOutcome>>,
    prompts: Mutex<usize>,
}

impl ScriptedBiometric {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            ..Self::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn push(&self, outcome: BiometricOutcome) -> &Self {
        self.outcomes.lock().push_back(outcome);
        self
    }

    /// Number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        *self.prompts.lock()
    }
}

impl Biometric for ScriptedBiometric {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn prompt(&self) -> BiometricOutcome {
        *self.prompts.lock() += 1;
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| BiometricOutcome::Failure("no scripted outcome".into()))
    }
}
