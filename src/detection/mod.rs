//! # Detection Module
//!
//! Station-side anomaly detectors run over every accepted sample.
//!
//! The station pushes the incoming sample into the history before running the
//! detectors, so `history.previous()` is the sample before `current`.
//!
//! Every detector in a [`DetectorSet`] runs on every sample. A detector that
//! errors is reported as a [`DetectorFault`] and does not stop the others.

pub mod attitude;
pub mod gps_jump;
pub mod heading_mismatch;
pub mod physics;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::config::DetectionConfig;
use crate::telemetry::{TelemetryHistory, TelemetrySample};

pub use attitude::AttitudeDetector;
pub use gps_jump::GpsJumpDetector;
pub use heading_mismatch::HeadingMismatchDetector;
pub use physics::PhysicsDetector;

/// Category of anomaly. Serialized as its upper-case name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertKind {
    GpsSpoof,
    GpsJamming,
    YawJump,
    ImuSpike,
    ImuHeadingMismatch,
    ImpossibleMovement,
    /// Raised by a custom detector
    Other(String),
}

impl AlertKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GpsSpoof => "GPS_SPOOF",
            Self::GpsJamming => "GPS_JAMMING",
            Self::YawJump => "YAW_JUMP",
            Self::ImuSpike => "IMU_SPIKE",
            Self::ImuHeadingMismatch => "IMU_HEADING_MISMATCH",
            Self::ImpossibleMovement => "IMPOSSIBLE_MOVEMENT",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for AlertKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "GPS_SPOOF" => Self::GpsSpoof,
            "GPS_JAMMING" => Self::GpsJamming,
            "YAW_JUMP" => Self::YawJump,
            "IMU_SPIKE" => Self::ImuSpike,
            "IMU_HEADING_MISMATCH" => Self::ImuHeadingMismatch,
            "IMPOSSIBLE_MOVEMENT" => Self::ImpossibleMovement,
            _ => Self::Other(name),
        }
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One detector finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyAlert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    /// Always true; kept on the wire for observers that filter on it
    pub anomaly: bool,
    pub detail: Value,
}

impl AnomalyAlert {
    #[must_use]
    pub fn new(kind: AlertKind, severity: Severity, detail: Value) -> Self {
        Self {
            kind,
            severity,
            anomaly: true,
            detail,
        }
    }
}

/// A detector could not evaluate the sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("field '{field}' is not finite")]
    NonFinite { field: &'static str },

    #[error("{0}")]
    Internal(String),
}

/// Rejects NaN and infinities.
pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, DetectorError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DetectorError::NonFinite { field })
    }
}

/// Anomaly check over the current sample and recent history.
pub trait Detector: Send + Sync {
    /// Short identifier used in fault reports and logs.
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the sample looks fine.
    fn evaluate(
        &self,
        current: &TelemetrySample,
        history: &TelemetryHistory,
    ) -> Result<Option<AnomalyAlert>, DetectorError>;
}

/// A detector that errored instead of producing a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorFault {
    pub detector: String,
    pub error: String,
}

/// Alerts and faults from one pass over all detectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionReport {
    pub alerts: Vec<AnomalyAlert>,
    pub faults: Vec<DetectorFault>,
}

impl DetectionReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.alerts.is_empty() && self.faults.is_empty()
    }
}

/// Ordered collection of detectors.
pub struct DetectorSet {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorSet {
    /// Empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self { detectors: Vec::new() }
    }

    /// The four built-in detectors configured from `[detection]`.
    #[must_use]
    pub fn standard(config: &DetectionConfig) -> Self {
        Self::empty()
            .with(GpsJumpDetector::new(config.gps_jump_threshold_m))
            .with(AttitudeDetector::new(config.attitude_limit_deg, config.yaw_jump_threshold_deg))
            .with(HeadingMismatchDetector::new(
                config.heading_mismatch_threshold_deg,
                config.heading_min_speed_mps,
            ))
            .with(PhysicsDetector::new(config.max_plausible_speed_mps))
    }

    /// Appends a detector.
    #[must_use]
    pub fn with<D: Detector + 'static>(mut self, detector: D) -> Self {
        self.add(Box::new(detector));
        self
    }

    pub fn add(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Runs every detector over `current`.
    pub fn evaluate(&self, current: &TelemetrySample, history: &TelemetryHistory) -> DetectionReport {
        let mut report = DetectionReport::default();
        for detector in &self.detectors {
            match detector.evaluate(current, history) {
                Ok(Some(alert)) => report.alerts.push(alert),
                Ok(None) => {}
                Err(e) => {
                    warn!("Detector '{}' failed: {}", detector.name(), e);
                    report.faults.push(DetectorFault {
                        detector: detector.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSet").field("detectors", &self.names()).finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::geo::GeoPoint;
    use crate::telemetry::{SampleSource, TelemetryHistory, TelemetrySample};

    pub const HOME: GeoPoint = GeoPoint::new(12.9718915, 77.6411545);

    pub fn sample(time: f64, point: GeoPoint) -> TelemetrySample {
        TelemetrySample {
            time,
            gps_lat: Some(point.lat),
            gps_lon: Some(point.lon),
            alt: 40.0,
            vx: 0.0,
            vy: 0.0,
            speed: 0.0,
            yaw: 0.0,
            roll: 0.0,
            pitch: 0.0,
            battery: 1.0,
            source: SampleSource::Normal,
            signature: None,
        }
    }

    /// History as the station holds it: `previous` then `current` pushed.
    pub fn history_of(samples: &[TelemetrySample]) -> TelemetryHistory {
        let mut history = TelemetryHistory::new(16);
        for s in samples {
            history.push(s.clone());
        }
        history
    }

    /// Point `meters` north of `from` along the planar approximation.
    pub fn planar_north(from: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(from.lat + meters / crate::geo::METERS_PER_DEGREE, from.lon)
    }
}
