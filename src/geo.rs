//! # Geodesic Math
//!
//! Great-circle helpers on a spherical Earth, plus the cheap equirectangular
//! approximation used by the detectors.
//!
//! The two distance functions are intentionally different. [`distance`] is the
//! haversine great-circle distance used to fly the drone; [`planar_distance`]
//! scales degree deltas by a flat 111 km per degree and is what the detector
//! thresholds are tuned against.
//!
//! ## Usage
//!
//! ```
//! use drone_guard::geo::{bearing, destination, distance, GeoPoint};
//!
//! let a = GeoPoint::new(12.9718915, 77.6411545);
//! let b = GeoPoint::new(12.9725, 77.6420);
//!
//! let back = destination(a, bearing(a, b), distance(a, b));
//! assert!(distance(back, b) < 0.01);
//! ```

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the spherical formulas (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree used by the planar approximation
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a new point from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns true when both coordinates are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance in meters (haversine).
#[must_use]
pub fn distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (p2.lon - p1.lon).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from `p1` to `p2` in degrees, normalized to [0, 360).
#[must_use]
pub fn bearing(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlon = (p2.lon - p1.lon).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_bearing(x.atan2(y).to_degrees())
}

/// Point reached by travelling `distance_m` meters from `p` along `bearing_deg`.
#[must_use]
pub fn destination(p: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let lat1 = p.lat.to_radians();
    let lon1 = p.lon.to_radians();
    let br = bearing_deg.to_radians();
    let d = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * br.cos()).asin();
    let lon2 = lon1 + (br.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(lat2.to_degrees(), wrap_longitude(lon2.to_degrees()))
}

/// Wraps a longitude into [-180, 180).
#[must_use]
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 540.0).rem_euclid(360.0) - 180.0
}

/// East/north offset in meters from `p1` to `p2` using the planar approximation.
///
/// Longitude is scaled by the cosine of `p1`'s latitude.
#[must_use]
pub fn planar_delta(p1: GeoPoint, p2: GeoPoint) -> (f64, f64) {
    let north = (p2.lat - p1.lat) * METERS_PER_DEGREE;
    let east = (p2.lon - p1.lon) * METERS_PER_DEGREE * p1.lat.to_radians().cos().abs();
    (east, north)
}

/// Equirectangular distance in meters. Cheaper and less accurate than [`distance`].
#[must_use]
pub fn planar_distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let (east, north) = planar_delta(p1, p2);
    east.hypot(north)
}

/// Normalizes any angle in degrees into [0, 360).
#[must_use]
pub fn normalize_bearing(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Absolute angular difference in degrees, in [0, 180].
///
/// Computed as `|((a - b + 180) mod 360) - 180|` so 359° and 1° are 2° apart.
#[must_use]
pub fn wrap_angle_diff(a: f64, b: f64) -> f64 {
    ((a - b + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Compass heading of a velocity vector (vx east, vy north) in [0, 360).
#[must_use]
pub fn heading_from_velocity(vx: f64, vy: f64) -> f64 {
    normalize_bearing(vx.atan2(vy).to_degrees())
}
