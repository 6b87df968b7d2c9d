//! # Telemetry Sample
//!
//! One timestamped snapshot of simulated drone state, serialized with the
//! field names used on the wire (`gps_lat`, `gps_lon`, `alt`, ...).

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Where a sample came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSource {
    /// Unmodified output of the flight generator
    #[default]
    Normal,
    /// Distorted by an active injection
    Injected,
    /// Frozen output while failsafe is engaged
    Failsafe,
}

impl std::fmt::Display for SampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Injected => "injected",
            Self::Failsafe => "failsafe",
        };
        f.write_str(name)
    }
}

/// A single telemetry snapshot.
///
/// GPS coordinates are optional on the wire: a sample that arrives without a
/// fix is still a valid sample, and the physics detector treats the gap as
/// possible jamming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Epoch seconds
    pub time: f64,
    /// Latitude in degrees
    #[serde(default)]
    pub gps_lat: Option<f64>,
    /// Longitude in degrees
    #[serde(default)]
    pub gps_lon: Option<f64>,
    /// Altitude in meters (constant for the simulated flight)
    #[serde(default)]
    pub alt: f64,
    /// Velocity east (m/s)
    #[serde(default)]
    pub vx: f64,
    /// Velocity north (m/s)
    #[serde(default)]
    pub vy: f64,
    /// Ground speed (m/s)
    #[serde(default)]
    pub speed: f64,
    /// Heading in degrees [0, 360)
    #[serde(default)]
    pub yaw: f64,
    /// Roll in degrees
    #[serde(default)]
    pub roll: f64,
    /// Pitch in degrees
    #[serde(default)]
    pub pitch: f64,
    /// Remaining battery fraction [0, 1]
    #[serde(default)]
    pub battery: f64,
    #[serde(default)]
    pub source: SampleSource,
    /// Detached signature checked by the station's signature gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl TelemetrySample {
    /// Returns the GPS position, or `None` if either coordinate is missing.
    #[must_use]
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.gps_lat, self.gps_lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    /// Moves the reported GPS position.
    pub fn set_position(&mut self, point: GeoPoint) {
        self.gps_lat = Some(point.lat);
        self.gps_lon = Some(point.lon);
    }

    /// Zeroes vx, vy and speed.
    pub fn zero_velocity(&mut self) {
        self.vx = 0.0;
        self.vy = 0.0;
        self.speed = 0.0;
    }

    /// Returns a copy tagged `failsafe` with zero velocity.
    ///
    /// Every failsafe sample goes through here so the zero-velocity
    /// invariant holds.
    #[must_use]
    pub fn frozen(&self, time: f64) -> Self {
        let mut sample = self.clone();
        sample.time = time;
        sample.zero_velocity();
        sample.source = SampleSource::Failsafe;
        sample
    }
}
