//! IMU-vs-velocity detector: the reported yaw should agree with the direction
//! of travel whenever the drone is actually moving.

use serde_json::json;

use super::{finite, AlertKind, AnomalyAlert, Detector, DetectorError, Severity};
use crate::geo;
use crate::telemetry::{TelemetryHistory, TelemetrySample};

#[derive(Debug, Clone)]
pub struct HeadingMismatchDetector {
    threshold_deg: f64,
    min_speed_mps: f64,
}

impl HeadingMismatchDetector {
    #[must_use]
    pub fn new(threshold_deg: f64, min_speed_mps: f64) -> Self {
        Self {
            threshold_deg,
            min_speed_mps,
        }
    }
}

impl Detector for HeadingMismatchDetector {
    fn name(&self) -> &'static str {
        "heading_mismatch"
    }

    fn evaluate(
        &self,
        current: &TelemetrySample,
        _history: &TelemetryHistory,
    ) -> Result<Option<AnomalyAlert>, DetectorError> {
        let vx = finite("vx", current.vx)?;
        let vy = finite("vy", current.vy)?;
        let yaw = finite("yaw", current.yaw)?;

        let speed = vx.hypot(vy);
        if speed < self.min_speed_mps {
            return Ok(None);
        }

        let course = geo::heading_from_velocity(vx, vy);
        let mismatch = geo::wrap_angle_diff(course, yaw);
        if mismatch > self.threshold_deg {
            return Ok(Some(AnomalyAlert::new(
                AlertKind::ImuHeadingMismatch,
                Severity::Medium,
                json!({ "course_deg": course, "yaw_deg": yaw, "mismatch_deg": mismatch }),
            )));
        }
        Ok(None)
    }
}
