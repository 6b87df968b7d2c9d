//! Operator attack board: the list of launched attack payloads the drone polls.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::info;

use crate::clock;
use crate::error::{DroneGuardError, Result};

#[derive(Debug, Default)]
pub struct AttackBoard {
    attacks: Mutex<Vec<Value>>,
}

impl AttackBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Value>> {
        self.attacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an attack payload, stamping `ts` when absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the payload is not a JSON object.
    pub fn launch(&self, mut payload: Value) -> Result<Value> {
        let object = payload
            .as_object_mut()
            .ok_or_else(|| DroneGuardError::InvalidPayload("attack must be a JSON object".to_string()))?;
        object.entry("ts").or_insert_with(|| Value::from(clock::now_s()));

        info!("Attack launched: {}", payload);
        self.lock().push(payload.clone());
        Ok(payload)
    }

    /// Removes every attack. Returns how many were cleared.
    pub fn clear(&self) -> usize {
        let mut attacks = self.lock();
        let cleared = attacks.len();
        attacks.clear();
        if cleared > 0 {
            info!("Cleared {} attack(s)", cleared);
        }
        cleared
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.lock().is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<Value> {
        self.lock().last().cloned()
    }

    #[must_use]
    pub fn list(&self) -> Vec<Value> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_launch_and_latest() {
        let board = AttackBoard::new();
        assert!(!board.is_active());
        assert!(board.latest().is_none());

        board.launch(json!({ "mode": "jump", "mag": 50 })).unwrap();
        board.launch(json!({ "mode": "speed", "mag": 4 })).unwrap();
        assert!(board.is_active());
        assert_eq!(board.latest().unwrap()["mode"], "speed");
        assert_eq!(board.list().len(), 2);
    }

    #[test]
    fn test_launch_stamps_ts() {
        let board = AttackBoard::new();
        let stored = board.launch(json!({ "mode": "jump" })).unwrap();
        assert!(stored["ts"].as_f64().unwrap() > 0.0);

        let stored = board.launch(json!({ "mode": "jump", "ts": 5 })).unwrap();
        assert_eq!(stored["ts"], 5);
    }

    #[test]
    fn test_non_object_rejected() {
        let board = AttackBoard::new();
        assert!(board.launch(json!("jump")).is_err());
        assert!(!board.is_active());
    }

    #[test]
    fn test_clear() {
        let board = AttackBoard::new();
        board.launch(json!({})).unwrap();
        assert_eq!(board.clear(), 1);
        assert_eq!(board.clear(), 0);
        assert!(!board.is_active());
    }
}
