//! # Waypoint Route
//!
//! A cyclic sequence of waypoints and the cursor that walks it.

use crate::error::{DroneGuardError, Result};
use crate::geo::GeoPoint;

/// Minimum number of points for the base flight route.
pub const MIN_BASE_ROUTE_POINTS: usize = 2;

/// Cyclic waypoint route.
///
/// The cursor is the index of the waypoint most recently reached; the next
/// target is always `(cursor + 1) % len`, so the cursor is valid for any
/// route length.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    points: Vec<GeoPoint>,
    cursor: usize,
}

impl Route {
    /// Builds the base route. Needs at least two valid points.
    pub fn base(points: Vec<GeoPoint>) -> Result<Self> {
        if points.len() < MIN_BASE_ROUTE_POINTS {
            return Err(DroneGuardError::InvalidRoute(format!(
                "base route needs at least {} waypoints, got {}",
                MIN_BASE_ROUTE_POINTS,
                points.len()
            )));
        }
        Self::build(points)
    }

    /// Builds an override route. A single point is allowed (fly to target).
    pub fn override_route(points: Vec<GeoPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(DroneGuardError::InvalidRoute(
                "override route needs at least one waypoint".to_string(),
            ));
        }
        Self::build(points)
    }

    fn build(points: Vec<GeoPoint>) -> Result<Self> {
        if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
            return Err(DroneGuardError::InvalidRoute(format!(
                "waypoint out of range: ({}, {})",
                bad.lat, bad.lon
            )));
        }
        Ok(Self { points, cursor: 0 })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed route.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First waypoint (where the drone starts).
    #[must_use]
    pub fn start(&self) -> GeoPoint {
        self.points[0]
    }

    /// Next waypoint to fly to.
    #[must_use]
    pub fn target(&self) -> GeoPoint {
        self.points[(self.cursor + 1) % self.points.len()]
    }

    /// Marks the current target as reached.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.points.len();
    }
}
