//! # Drone Guard Library
//!
//! Simulated drone telemetry with adversarial injection, anomaly detection and
//! failsafe response.
//!
//! The closed loop is formed by three cooperating state machines:
//!
//! - the flight generator and injection engine on the drone, which can distort
//!   their own output on operator command
//! - the drone's local heuristic, which can declare an emergency before the
//!   station confirms it
//! - the ground station's detectors and failsafe authority, which reach the
//!   same verdict independently from the telemetry stream

pub mod clock;
pub mod config;
pub mod detection;
pub mod drone;
pub mod error;
pub mod failsafe;
pub mod flight;
pub mod geo;
pub mod injection;
pub mod link;
pub mod logging;
pub mod station;
pub mod telemetry;
