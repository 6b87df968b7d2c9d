//! GPS jump detector: flags a planar displacement between consecutive
//! samples above the threshold as `GPS_SPOOF`.

use serde_json::json;

use super::{finite, AlertKind, AnomalyAlert, Detector, DetectorError, Severity};
use crate::geo;
use crate::telemetry::{TelemetryHistory, TelemetrySample};

#[derive(Debug, Clone)]
pub struct GpsJumpDetector {
    threshold_m: f64,
}

impl GpsJumpDetector {
    #[must_use]
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }
}

impl Detector for GpsJumpDetector {
    fn name(&self) -> &'static str {
        "gps_jump"
    }

    fn evaluate(
        &self,
        current: &TelemetrySample,
        history: &TelemetryHistory,
    ) -> Result<Option<AnomalyAlert>, DetectorError> {
        let Some(previous) = history.previous() else {
            return Ok(None);
        };
        // Missing fixes are the physics detector's concern
        let (Some(from), Some(to)) = (previous.position(), current.position()) else {
            return Ok(None);
        };

        let jump = finite("gps", geo::planar_distance(from, to))?;
        if jump > self.threshold_m {
            return Ok(Some(AnomalyAlert::new(
                AlertKind::GpsSpoof,
                Severity::High,
                json!({ "jump_m": jump, "threshold_m": self.threshold_m }),
            )));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::test_support::*;

    fn run(meters: f64) -> Option<AnomalyAlert> {
        let prev = sample(0.0, HOME);
        let current = sample(1.0, planar_north(HOME, meters));
        GpsJumpDetector::new(20.0)
            .evaluate(&current, &history_of(&[prev, current.clone()]))
            .unwrap()
    }

    #[test]
    fn test_small_move_is_clean() {
        assert!(run(5.0).is_none());
    }

    #[test]
    fn test_large_jump_is_spoof() {
        let alert = run(25.0).unwrap();
        assert_eq!(alert.kind, AlertKind::GpsSpoof);
        assert_eq!(alert.severity, Severity::High);
        assert!((alert.detail["jump_m"].as_f64().unwrap() - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(run(20.0 - 1e-6).is_none());
        assert!(run(20.0 + 1e-6).is_some());
    }

    #[test]
    fn test_needs_previous_sample() {
        let current = sample(1.0, HOME);
        let result = GpsJumpDetector::new(20.0)
            .evaluate(&current, &history_of(&[current.clone()]))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_missing_gps_is_skipped() {
        let prev = sample(0.0, HOME);
        let mut current = sample(1.0, HOME);
        current.gps_lat = None;
        let result = GpsJumpDetector::new(20.0)
            .evaluate(&current, &history_of(&[prev, current.clone()]))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_non_finite_position_is_an_error() {
        let prev = sample(0.0, HOME);
        let mut current = sample(1.0, HOME);
        current.gps_lat = Some(f64::NAN);
        let result = GpsJumpDetector::new(20.0).evaluate(&current, &history_of(&[prev, current.clone()]));
        assert_eq!(result, Err(DetectorError::NonFinite { field: "gps" }));
    }
}
