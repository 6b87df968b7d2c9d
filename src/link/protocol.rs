//! # Wire Protocol
//!
//! JSON envelopes exchanged between the drone, the station and observers.
//! Every envelope is an object with a `type` tag.
//!
//! ## Uplink (drone → station)
//!
//! ```json
//! {"type":"hello","drone_id":"drone_pi","time":1700000000.0}
//! {"type":"telemetry","payload":{...sample...},"injection_detail":null}
//! ```
//!
//! ## Observer (station → observers)
//!
//! - `telemetry`: accepted sample with alerts, failsafe snapshot and decision
//! - `signature_fail`: sample rejected by the signature gate
//! - `diagnostic`: event posted by a drone
//! - `failsafe`: failsafe changed by an operator

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::detection::{AnomalyAlert, DetectorFault};
use crate::error::Result;
use crate::failsafe::{Decision, FailsafeSnapshot};
use crate::injection::InjectionSummary;
use crate::telemetry::TelemetrySample;

/// Drone → station frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UplinkMessage {
    /// Sent on every (re)connect
    Hello { drone_id: String, time: f64 },
    Telemetry {
        payload: TelemetrySample,
        #[serde(default)]
        injection_detail: Option<InjectionSummary>,
    },
}

impl UplinkMessage {
    #[must_use]
    pub fn telemetry(payload: TelemetrySample, injection_detail: Option<InjectionSummary>) -> Self {
        Self::Telemetry {
            payload,
            injection_detail,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Event recorded by the station's diagnostic log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Raw attack payload active when the event happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<Value>,
    pub timestamp: f64,
}

impl DiagnosticEvent {
    /// Event posted when the drone's heuristic declares a failsafe.
    #[must_use]
    pub fn auto_failsafe(reason: &str, attack: Option<Value>, timestamp: f64) -> Self {
        Self {
            event: "auto_failsafe_triggered".to_string(),
            reason: Some(reason.to_string()),
            attack,
            timestamp,
        }
    }
}

/// Station → observer frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverMessage {
    Telemetry {
        payload: TelemetrySample,
        alerts: Vec<AnomalyAlert>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        faults: Vec<DetectorFault>,
        failsafe: FailsafeSnapshot,
        decision: Decision,
        injection_detail: Option<InjectionSummary>,
    },
    SignatureFail {
        payload: TelemetrySample,
    },
    Diagnostic {
        event: DiagnosticEvent,
    },
    Failsafe {
        failsafe: FailsafeSnapshot,
    },
}

impl ObserverMessage {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Telemetry { .. } => "telemetry",
            Self::SignatureFail { .. } => "signature_fail",
            Self::Diagnostic { .. } => "diagnostic",
            Self::Failsafe { .. } => "failsafe",
        }
    }
}
