//! # Flight Path Generator
//!
//! Walks the drone through its waypoint route and produces one telemetry
//! sample per step.
//!
//! ## Motion Model
//!
//! Each step flies `speed * dt` meters toward the next waypoint of the active
//! route (the override route when one is installed, otherwise the base route).
//! If the waypoint is within reach the drone snaps onto it and the route's
//! cursor advances. Velocity is re-derived from the positional delta using the
//! planar approximation, and yaw follows the velocity vector unless the drone
//! is practically stationary.
//!
//! ## Usage
//!
//! ```
//! use drone_guard::flight::{FlightParams, FlightPathGenerator, Route};
//! use drone_guard::geo::GeoPoint;
//!
//! let route = Route::base(vec![
//!     GeoPoint::new(12.9718915, 77.6411545),
//!     GeoPoint::new(12.9725, 77.6420),
//! ])?;
//! let mut generator = FlightPathGenerator::new(route, FlightParams::default());
//!
//! let sample = generator.step(0.25, None, 1_700_000_000.0);
//! assert!((sample.speed - 3.0).abs() < 0.1);
//! # Ok::<(), drone_guard::error::DroneGuardError>(())
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::route::Route;
use crate::error::Result;
use crate::geo::{self, GeoPoint};
use crate::telemetry::{SampleSource, TelemetrySample};

/// Below this speed (m/s) yaw is held to avoid chatter.
const YAW_HOLD_SPEED_MPS: f64 = 0.01;

/// Roll jitter amplitude (degrees)
const ROLL_AMPLITUDE_DEG: f64 = 5.0;

/// Pitch jitter amplitude (degrees)
const PITCH_AMPLITUDE_DEG: f64 = 3.0;

/// Motion parameters for the generator.
#[derive(Debug, Clone)]
pub struct FlightParams {
    /// Cruise speed in m/s
    pub cruise_speed_mps: f64,
    /// Fixed altitude in meters
    pub altitude_m: f64,
    /// Battery fraction drained per second
    pub battery_drain_per_sec: f64,
    /// RNG seed for deterministic jitter. None = random.
    pub seed: Option<u64>,
}

impl Default for FlightParams {
    fn default() -> Self {
        Self {
            cruise_speed_mps: 3.0,
            altitude_m: 40.0,
            battery_drain_per_sec: 0.0005,
            seed: None,
        }
    }
}

/// Waypoint-following drone simulator.
#[derive(Debug)]
pub struct FlightPathGenerator {
    params: FlightParams,
    base: Route,
    override_route: Option<Route>,
    pos: GeoPoint,
    vx: f64,
    vy: f64,
    speed: f64,
    yaw: f64,
    roll: f64,
    pitch: f64,
    battery: f64,
    rng: StdRng,
}

impl FlightPathGenerator {
    /// Creates a generator positioned on the route's first waypoint.
    #[must_use]
    pub fn new(base: Route, params: FlightParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            pos: base.start(),
            base,
            override_route: None,
            vx: 0.0,
            vy: 0.0,
            speed: 0.0,
            yaw: 0.0,
            roll: 0.0,
            pitch: 0.0,
            battery: 1.0,
            params,
            rng,
        }
    }

    /// Builds the base route from raw points and creates the generator.
    pub fn with_waypoints(points: Vec<GeoPoint>, params: FlightParams) -> Result<Self> {
        Ok(Self::new(Route::base(points)?, params))
    }

    /// Advances the simulation by `dt` seconds and returns the new sample.
    ///
    /// # Arguments
    ///
    /// * `dt` - Elapsed time in seconds since the previous step
    /// * `override_speed` - Speed in m/s to fly instead of the cruise speed
    /// * `now` - Timestamp (epoch seconds) stamped on the sample
    pub fn step(&mut self, dt: f64, override_speed: Option<f64>, now: f64) -> TelemetrySample {
        let speed = override_speed.unwrap_or(self.params.cruise_speed_mps);
        let travel = speed * dt.max(0.0);

        let route = match self.override_route.as_mut() {
            Some(route) => route,
            None => &mut self.base,
        };
        let target = route.target();
        let dist = geo::distance(self.pos, target);

        let new_pos = if dist == 0.0 {
            // Already on the target: hold position, move on to the next leg
            route.advance();
            self.pos
        } else if travel <= 0.0 {
            self.pos
        } else if travel >= dist {
            route.advance();
            debug!("Reached waypoint ({:.7}, {:.7})", target.lat, target.lon);
            target
        } else {
            geo::destination(self.pos, geo::bearing(self.pos, target), travel)
        };

        let (east, north) = geo::planar_delta(self.pos, new_pos);
        let (vx, vy) = if dt > 0.0 { (east / dt, north / dt) } else { (0.0, 0.0) };
        let speed_now = vx.hypot(vy);

        if speed_now > YAW_HOLD_SPEED_MPS {
            self.yaw = geo::heading_from_velocity(vx, vy);
        }

        let jitter: f64 = self.rng.gen();
        self.roll = (now * 0.5 + jitter).sin() * ROLL_AMPLITUDE_DEG;
        self.pitch = (now * 0.4 + jitter).cos() * PITCH_AMPLITUDE_DEG;

        self.battery = (self.battery - self.params.battery_drain_per_sec * dt.max(0.0)).clamp(0.0, 1.0);

        self.pos = new_pos;
        self.vx = vx;
        self.vy = vy;
        self.speed = speed_now;

        self.current_sample(now)
    }

    /// Sample at the current position with zero velocity, tagged `failsafe`.
    #[must_use]
    pub fn frozen_sample(&self, now: f64) -> TelemetrySample {
        self.current_sample(now).frozen(now)
    }

    fn current_sample(&self, now: f64) -> TelemetrySample {
        TelemetrySample {
            time: now,
            gps_lat: Some(self.pos.lat),
            gps_lon: Some(self.pos.lon),
            alt: self.params.altitude_m,
            vx: self.vx,
            vy: self.vy,
            speed: self.speed,
            yaw: self.yaw,
            roll: self.roll,
            pitch: self.pitch,
            battery: self.battery,
            source: SampleSource::Normal,
            signature: None,
        }
    }

    /// Installs a temporary route. An empty list clears the override.
    ///
    /// Installing always restarts the override cursor at 0; the base route's
    /// cursor is untouched.
    pub fn set_override_route(&mut self, points: Vec<GeoPoint>) -> Result<()> {
        if points.is_empty() {
            self.clear_override_route();
            return Ok(());
        }
        let route = Route::override_route(points)?;
        info!("Route override set: {} waypoint(s)", route.len());
        self.override_route = Some(route);
        Ok(())
    }

    /// Removes the override route, resuming the base route where it left off.
    pub fn clear_override_route(&mut self) {
        if self.override_route.take().is_some() {
            info!("Route override cleared");
        }
    }

    #[must_use]
    pub fn has_override(&self) -> bool {
        self.override_route.is_some()
    }

    #[must_use]
    pub fn override_points(&self) -> Option<&[GeoPoint]> {
        self.override_route.as_ref().map(Route::points)
    }

    #[must_use]
    pub fn position(&self) -> GeoPoint {
        self.pos
    }

    /// Cursor of the base route.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.base.cursor()
    }

    #[must_use]
    pub fn battery(&self) -> f64 {
        self.battery
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[must_use]
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    #[must_use]
    pub fn params(&self) -> &FlightParams {
        &self.params
    }
}
