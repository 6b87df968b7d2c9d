//! Control plane served directly by an in-process [`GroundStation`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::GroundStation;
use crate::error::Result;
use crate::failsafe::FailsafeSnapshot;
use crate::link::{ControlPlane, DiagnosticEvent};

#[derive(Debug, Clone)]
pub struct LocalControl {
    station: Arc<GroundStation>,
}

impl LocalControl {
    #[must_use]
    pub fn new(station: Arc<GroundStation>) -> Self {
        Self { station }
    }
}

#[async_trait]
impl ControlPlane for LocalControl {
    async fn attack_active(&self) -> Result<bool> {
        Ok(self.station.attack_active())
    }

    async fn latest_attack(&self) -> Result<Option<Value>> {
        Ok(self.station.latest_attack())
    }

    async fn failsafe_state(&self) -> Result<FailsafeSnapshot> {
        Ok(self.station.failsafe().snapshot())
    }

    async fn activate_failsafe(&self, reason: String) -> Result<FailsafeSnapshot> {
        Ok(self.station.activate_failsafe(&reason))
    }

    async fn post_event(&self, event: DiagnosticEvent) -> Result<()> {
        self.station.record_event(event);
        Ok(())
    }
}
