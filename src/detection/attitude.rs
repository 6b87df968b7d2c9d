//! Attitude detector.
//!
//! Raises `IMU_SPIKE` when roll or pitch exceeds the attitude limit, otherwise
//! `YAW_JUMP` when the heading swings more than the yaw threshold between
//! consecutive samples.

use serde_json::json;

use super::{finite, AlertKind, AnomalyAlert, Detector, DetectorError, Severity};
use crate::geo;
use crate::telemetry::{TelemetryHistory, TelemetrySample};

#[derive(Debug, Clone)]
pub struct AttitudeDetector {
    attitude_limit_deg: f64,
    yaw_jump_threshold_deg: f64,
}

impl AttitudeDetector {
    #[must_use]
    pub fn new(attitude_limit_deg: f64, yaw_jump_threshold_deg: f64) -> Self {
        Self {
            attitude_limit_deg,
            yaw_jump_threshold_deg,
        }
    }
}

impl Detector for AttitudeDetector {
    fn name(&self) -> &'static str {
        "attitude"
    }

    fn evaluate(
        &self,
        current: &TelemetrySample,
        history: &TelemetryHistory,
    ) -> Result<Option<AnomalyAlert>, DetectorError> {
        let roll = finite("roll", current.roll)?;
        let pitch = finite("pitch", current.pitch)?;

        if roll.abs() > self.attitude_limit_deg || pitch.abs() > self.attitude_limit_deg {
            return Ok(Some(AnomalyAlert::new(
                AlertKind::ImuSpike,
                Severity::Medium,
                json!({ "roll": roll, "pitch": pitch, "limit_deg": self.attitude_limit_deg }),
            )));
        }

        let Some(previous) = history.previous() else {
            return Ok(None);
        };
        let yaw = finite("yaw", current.yaw)?;
        let previous_yaw = finite("yaw", previous.yaw)?;
        let delta = geo::wrap_angle_diff(yaw, previous_yaw);

        if delta > self.yaw_jump_threshold_deg {
            return Ok(Some(AnomalyAlert::new(
                AlertKind::YawJump,
                Severity::Medium,
                json!({ "yaw_delta_deg": delta, "from": previous_yaw, "to": yaw }),
            )));
        }
        Ok(None)
    }
}
