//! # Route Directive
//!
//! Destination hints carried by an attack payload.
//!
//! Three encodings are tried in order, and the first usable one wins:
//!
//! 1. `waypoints`: a non-empty list of `[lat, lon]` pairs or `{lat, lon}` objects
//! 2. `target_lat` + `target_lon`
//! 3. `lat` + `lon`
//!
//! A link that is present but malformed is rejected with a [`DirectiveError`]
//! and decoding moves on to the next link.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::geo::GeoPoint;

/// Where a hijack wants the drone to go.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDirective {
    /// Single destination
    Target(GeoPoint),
    /// Multi-point route
    Waypoints(Vec<GeoPoint>),
}

impl RouteDirective {
    #[must_use]
    pub fn points(&self) -> Vec<GeoPoint> {
        match self {
            Self::Target(point) => vec![*point],
            Self::Waypoints(points) => points.clone(),
        }
    }

    /// First (or only) point.
    #[must_use]
    pub fn first(&self) -> GeoPoint {
        match self {
            Self::Target(point) => *point,
            // decode() never builds an empty list
            Self::Waypoints(points) => points.first().copied().unwrap_or(GeoPoint::new(0.0, 0.0)),
        }
    }
}

/// Why a directive link was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectiveError {
    #[error("waypoints must be a list")]
    NotAList,

    #[error("waypoint {index} is malformed: {found}")]
    MalformedWaypoint { index: usize, found: String },

    #[error("'{present}' given without '{missing}'")]
    PartialPair {
        present: &'static str,
        missing: &'static str,
    },

    #[error("'{field}' is not a number: {found}")]
    NotANumber { field: &'static str, found: String },

    #[error("coordinate ({lat}, {lon}) is out of range")]
    OutOfRange { lat: f64, lon: f64 },
}

/// Result of walking the fallback chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedDirective {
    pub directive: Option<RouteDirective>,
    /// Links that were present but unusable
    pub rejected: Vec<DirectiveError>,
}

/// Reads a JSON number or a numeric string.
#[must_use]
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Walks the directive fallback chain over a payload object.
#[must_use]
pub fn decode(payload: &Map<String, Value>) -> DecodedDirective {
    let mut decoded = DecodedDirective::default();

    if let Some(value) = payload.get("waypoints") {
        match waypoint_list(value) {
            Ok(Some(points)) => {
                decoded.directive = Some(RouteDirective::Waypoints(points));
                return decoded;
            }
            Ok(None) => {}
            Err(e) => decoded.rejected.push(e),
        }
    }

    for (lat_key, lon_key) in [("target_lat", "target_lon"), ("lat", "lon")] {
        match coordinate_pair(payload, lat_key, lon_key) {
            Ok(Some(point)) => {
                decoded.directive = Some(RouteDirective::Target(point));
                return decoded;
            }
            Ok(None) => {}
            Err(e) => decoded.rejected.push(e),
        }
    }

    decoded
}

/// `Ok(None)` for an empty list.
fn waypoint_list(value: &Value) -> Result<Option<Vec<GeoPoint>>, DirectiveError> {
    let entries = value.as_array().ok_or(DirectiveError::NotAList)?;
    if entries.is_empty() {
        return Ok(None);
    }

    let mut points = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let malformed = || DirectiveError::MalformedWaypoint {
            index,
            found: entry.to_string(),
        };
        let (lat, lon) = match entry {
            Value::Array(pair) if pair.len() >= 2 => (number(&pair[0]), number(&pair[1])),
            Value::Object(fields) => (
                fields.get("lat").and_then(number),
                fields.get("lon").and_then(number),
            ),
            _ => return Err(malformed()),
        };
        match (lat, lon) {
            (Some(lat), Some(lon)) => points.push(checked(lat, lon)?),
            _ => return Err(malformed()),
        }
    }
    Ok(Some(points))
}

/// `Ok(None)` when neither key is present.
fn coordinate_pair(
    payload: &Map<String, Value>,
    lat_key: &'static str,
    lon_key: &'static str,
) -> Result<Option<GeoPoint>, DirectiveError> {
    let (lat, lon) = match (payload.get(lat_key), payload.get(lon_key)) {
        (None, None) => return Ok(None),
        (Some(_), None) => {
            return Err(DirectiveError::PartialPair {
                present: lat_key,
                missing: lon_key,
            })
        }
        (None, Some(_)) => {
            return Err(DirectiveError::PartialPair {
                present: lon_key,
                missing: lat_key,
            })
        }
        (Some(lat), Some(lon)) => (lat, lon),
    };

    let lat = number(lat).ok_or_else(|| DirectiveError::NotANumber {
        field: lat_key,
        found: lat.to_string(),
    })?;
    let lon = number(lon).ok_or_else(|| DirectiveError::NotANumber {
        field: lon_key,
        found: lon.to_string(),
    })?;
    checked(lat, lon).map(Some)
}

fn checked(lat: f64, lon: f64) -> Result<GeoPoint, DirectiveError> {
    let point = GeoPoint::new(lat, lon);
    if point.is_valid() {
        Ok(point)
    } else {
        Err(DirectiveError::OutOfRange { lat, lon })
    }
}
