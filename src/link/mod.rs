//! # Link Module
//!
//! Everything that crosses the drone/station boundary.
//!
//! This module handles:
//! - Uplink and observer JSON envelopes
//! - Telemetry link and control plane traits
//! - An in-process channel transport

pub mod channel;
pub mod protocol;
pub mod transport;

pub use channel::{ChannelConnector, ChannelLink};
pub use protocol::{DiagnosticEvent, ObserverMessage, UplinkMessage};
pub use transport::{ControlPlane, LinkConnector, TelemetryLink};
