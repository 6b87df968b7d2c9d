//! # Telemetry Module
//!
//! Telemetry samples as they travel from the drone to the ground station.
//!
//! This module handles:
//! - The [`TelemetrySample`] record and its `source` tag
//! - The bounded [`TelemetryHistory`] shared by all detectors

pub mod history;
pub mod sample;

pub use history::TelemetryHistory;
pub use sample::{SampleSource, TelemetrySample};
