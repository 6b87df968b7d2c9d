//! # Error Types
//!
//! Custom error types for Drone Guard using `thiserror`.

use thiserror::Error;

/// Main error type for Drone Guard
#[derive(Debug, Error)]
pub enum DroneGuardError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Envelope (de)serialization errors
    #[error("Envelope error: {0}")]
    Envelope(#[from] serde_json::Error),

    /// Telemetry link errors (connection refused, closed, send failed)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Control plane request did not answer in time
    #[error("Control request '{0}' timed out")]
    ControlTimeout(&'static str),

    /// Invalid waypoint route
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// Attack payload could not be decoded
    #[error("Invalid attack payload: {0}")]
    InvalidPayload(String),
}

/// Result type alias for Drone Guard
pub type Result<T> = std::result::Result<T, DroneGuardError>;
