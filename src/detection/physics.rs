//! # Physics Detector
//!
//! Flags movement no airframe of this class could perform.
//!
//! - `GPS_JAMMING` when either the current or the previous sample has no fix
//! - `IMPOSSIBLE_MOVEMENT` when the speed implied by the planar displacement
//!   over the sample interval exceeds the ceiling
//! - `IMPOSSIBLE_MOVEMENT` when the reported speed exceeds the ceiling
//!
//! Nothing is checked until a previous sample exists.

use serde_json::json;

use super::{finite, AlertKind, AnomalyAlert, Detector, DetectorError, Severity};
use crate::geo;
use crate::telemetry::{TelemetryHistory, TelemetrySample};

#[derive(Debug, Clone)]
pub struct PhysicsDetector {
    max_speed_mps: f64,
}

impl PhysicsDetector {
    #[must_use]
    pub fn new(max_speed_mps: f64) -> Self {
        Self { max_speed_mps }
    }

    fn impossible(&self, detail: serde_json::Value) -> Option<AnomalyAlert> {
        Some(AnomalyAlert::new(AlertKind::ImpossibleMovement, Severity::High, detail))
    }
}

impl Detector for PhysicsDetector {
    fn name(&self) -> &'static str {
        "physics"
    }

    fn evaluate(
        &self,
        current: &TelemetrySample,
        history: &TelemetryHistory,
    ) -> Result<Option<AnomalyAlert>, DetectorError> {
        let Some(previous) = history.previous() else {
            return Ok(None);
        };

        let (from, to) = match (previous.position(), current.position()) {
            (Some(from), Some(to)) => (from, to),
            (_, to) => {
                let missing = if to.is_none() { "current" } else { "previous" };
                return Ok(Some(AnomalyAlert::new(
                    AlertKind::GpsJamming,
                    Severity::High,
                    json!({ "missing_fix": missing }),
                )));
            }
        };

        let dt = finite("time", current.time - previous.time)?;
        if dt > 0.0 {
            let implied = finite("gps", geo::planar_distance(from, to))? / dt;
            if implied > self.max_speed_mps {
                return Ok(self.impossible(json!({
                    "implied_speed_mps": implied,
                    "dt_s": dt,
                    "max_speed_mps": self.max_speed_mps,
                })));
            }
        }

        let vx = finite("vx", current.vx)?;
        let vy = finite("vy", current.vy)?;
        let reported = finite("speed", current.speed)?.max(vx.hypot(vy));
        if reported > self.max_speed_mps {
            return Ok(self.impossible(json!({
                "reported_speed_mps": reported,
                "max_speed_mps": self.max_speed_mps,
            })));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::test_support::*;

    fn detector() -> PhysicsDetector {
        PhysicsDetector::new(50.0)
    }

    fn run(prev: TelemetrySample, current: TelemetrySample) -> Option<AnomalyAlert> {
        detector().evaluate(&current, &history_of(&[prev, current.clone()])).unwrap()
    }

    #[test]
    fn test_plausible_motion() {
        assert!(run(sample(0.0, HOME), sample(1.0, planar_north(HOME, 10.0))).is_none());
    }

    #[test]
    fn test_teleport_is_impossible() {
        let alert = run(sample(0.0, HOME), sample(1.0, planar_north(HOME, 80.0))).unwrap();
        assert_eq!(alert.kind, AlertKind::ImpossibleMovement);
        assert_eq!(alert.severity, Severity::High);
        assert!((alert.detail["implied_speed_mps"].as_f64().unwrap() - 80.0).abs() < 1e-6);
    }

    #[test]
    fn test_implied_speed_boundary() {
        assert!(run(sample(0.0, HOME), sample(2.0, planar_north(HOME, 100.0 - 1e-5))).is_none());
        assert!(run(sample(0.0, HOME), sample(2.0, planar_north(HOME, 100.0 + 1e-5))).is_some());
    }

    #[test]
    fn test_reported_speed_too_high() {
        let mut current = sample(1.0, HOME);
        current.speed = 60.0;
        let alert = run(sample(0.0, HOME), current).unwrap();
        assert_eq!(alert.kind, AlertKind::ImpossibleMovement);
        assert_eq!(alert.detail["reported_speed_mps"], 60.0);
    }

    #[test]
    fn test_velocity_components_count_as_speed() {
        let mut current = sample(1.0, HOME);
        current.vx = 40.0;
        current.vy = 40.0;
        assert!(run(sample(0.0, HOME), current).is_some());
    }

    #[test]
    fn test_zero_dt_skips_implied_speed() {
        assert!(run(sample(5.0, HOME), sample(5.0, planar_north(HOME, 500.0))).is_none());
    }

    #[test]
    fn test_missing_current_fix_is_jamming() {
        let mut current = sample(1.0, HOME);
        current.gps_lon = None;
        let alert = run(sample(0.0, HOME), current).unwrap();
        assert_eq!(alert.kind, AlertKind::GpsJamming);
        assert_eq!(alert.detail["missing_fix"], "current");
    }

    #[test]
    fn test_missing_previous_fix_is_jamming() {
        let mut prev = sample(0.0, HOME);
        prev.gps_lat = None;
        let alert = run(prev, sample(1.0, HOME)).unwrap();
        assert_eq!(alert.kind, AlertKind::GpsJamming);
        assert_eq!(alert.detail["missing_fix"], "previous");
    }

    #[test]
    fn test_first_sample_is_not_checked() {
        let mut current = sample(1.0, HOME);
        current.gps_lat = None;
        current.speed = 500.0;
        assert!(detector()
            .evaluate(&current, &history_of(&[current.clone()]))
            .unwrap()
            .is_none());
    }
}
