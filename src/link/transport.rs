//! Trait abstraction for the drone's links to the station.
//!
//! Telemetry flows over a [`TelemetryLink`] obtained from a [`LinkConnector`];
//! attack and failsafe polling goes through the [`ControlPlane`].

use async_trait::async_trait;
use serde_json::Value;

use super::protocol::DiagnosticEvent;
use crate::error::Result;
use crate::failsafe::FailsafeSnapshot;

/// One connected telemetry uplink.
#[async_trait]
pub trait TelemetryLink: Send {
    /// Send one encoded frame
    async fn send(&mut self, frame: String) -> Result<()>;
}

/// Opens telemetry links; called again after every disconnect.
#[async_trait]
pub trait LinkConnector: Send + Sync {
    type Link: TelemetryLink;

    async fn connect(&self) -> Result<Self::Link>;

    /// Human-readable endpoint for logs
    fn endpoint(&self) -> String;
}

/// Request/response side channel to the station.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Whether any attack is currently launched
    async fn attack_active(&self) -> Result<bool>;

    /// Most recent attack payload
    async fn latest_attack(&self) -> Result<Option<Value>>;

    async fn failsafe_state(&self) -> Result<FailsafeSnapshot>;

    async fn activate_failsafe(&self, reason: String) -> Result<FailsafeSnapshot>;

    async fn post_event(&self, event: DiagnosticEvent) -> Result<()>;
}
