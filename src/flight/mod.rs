//! # Flight Module
//!
//! Waypoint-following motion model for the simulated drone.
//!
//! This module handles:
//! - Cyclic waypoint routes with their own cursor
//! - Stepping the drone along great-circle legs at cruise speed
//! - Temporary override routes installed by hijack injections
//! - Deriving velocity, yaw, cosmetic roll/pitch and battery drain

pub mod generator;
pub mod route;

pub use generator::{FlightParams, FlightPathGenerator};
pub use route::Route;
