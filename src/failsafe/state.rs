//! # Failsafe State
//!
//! The station's authoritative failsafe latch.
//!
//! State only changes through `activate`, `activate_with`, `deactivate` and
//! `reset`. Activation is idempotent: while active, a repeat activation keeps
//! the original action, reason and timestamp and only appends a `duplicate`
//! entry to the history. The history is append-only until `reset`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock;

/// Response the failsafe asks the drone to take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FailsafeAction {
    #[default]
    None,
    Hold,
    Land,
    Kill,
}

impl std::fmt::Display for FailsafeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Hold => "HOLD",
            Self::Land => "LAND",
            Self::Kill => "KILL",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of the failsafe state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailsafeSnapshot {
    pub active: bool,
    pub action: FailsafeAction,
    pub reason: Option<String>,
    /// Epoch seconds of the activation that is currently latched
    pub activated_at: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailsafeEventKind {
    Activated,
    /// Activation requested while already active
    Duplicate,
    Deactivated,
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailsafeEvent {
    pub kind: FailsafeEventKind,
    pub action: FailsafeAction,
    pub reason: Option<String>,
    pub at: f64,
}

/// What an activation request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The latch went from inactive to active
    Latched,
    /// Already active; original state kept
    AlreadyActive,
}

/// Unsynchronized failsafe state machine.
#[derive(Debug, Clone, Default)]
pub struct FailsafeState {
    snapshot: FailsafeSnapshot,
    history: Vec<FailsafeEvent>,
}

impl FailsafeState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate_with(&mut self, action: FailsafeAction, reason: &str, now: f64) -> Activation {
        if self.snapshot.active {
            self.history.push(FailsafeEvent {
                kind: FailsafeEventKind::Duplicate,
                action,
                reason: Some(reason.to_string()),
                at: now,
            });
            return Activation::AlreadyActive;
        }

        self.snapshot = FailsafeSnapshot {
            active: true,
            action,
            reason: Some(reason.to_string()),
            activated_at: Some(now),
        };
        self.history.push(FailsafeEvent {
            kind: FailsafeEventKind::Activated,
            action,
            reason: Some(reason.to_string()),
            at: now,
        });
        Activation::Latched
    }

    /// Returns true if the state changed.
    pub fn deactivate(&mut self, now: f64) -> bool {
        if !self.snapshot.active {
            return false;
        }
        self.snapshot = FailsafeSnapshot::default();
        self.history.push(FailsafeEvent {
            kind: FailsafeEventKind::Deactivated,
            action: FailsafeAction::None,
            reason: None,
            at: now,
        });
        true
    }

    /// Back to inactive with an empty history.
    pub fn reset(&mut self) {
        self.snapshot = FailsafeSnapshot::default();
        self.history.clear();
    }

    #[must_use]
    pub fn snapshot(&self) -> &FailsafeSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn history(&self) -> &[FailsafeEvent] {
        &self.history
    }
}

/// Thread-safe failsafe latch shared by the station and its control plane.
#[derive(Debug, Default)]
pub struct FailsafeAuthority {
    state: Mutex<FailsafeState>,
}

impl FailsafeAuthority {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FailsafeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Activates with the HOLD action.
    pub fn activate(&self, reason: &str) -> FailsafeSnapshot {
        self.activate_with(FailsafeAction::Hold, reason)
    }

    pub fn activate_with(&self, action: FailsafeAction, reason: &str) -> FailsafeSnapshot {
        let mut state = self.lock();
        match state.activate_with(action, reason, clock::now_s()) {
            Activation::Latched => warn!("FAILSAFE ACTIVATED: {} ({})", action, reason),
            Activation::AlreadyActive => debug!("Failsafe already active, ignoring '{}'", reason),
        }
        state.snapshot().clone()
    }

    pub fn deactivate(&self) -> FailsafeSnapshot {
        let mut state = self.lock();
        if state.deactivate(clock::now_s()) {
            info!("Failsafe deactivated");
        }
        state.snapshot().clone()
    }

    pub fn reset(&self) {
        self.lock().reset();
        info!("Failsafe reset");
    }

    #[must_use]
    pub fn snapshot(&self) -> FailsafeSnapshot {
        self.lock().snapshot().clone()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().snapshot().active
    }

    #[must_use]
    pub fn history(&self) -> Vec<FailsafeEvent> {
        self.lock().history().to_vec()
    }
}
