//! # Injection Spec
//!
//! Decodes an operator attack payload into a typed [`InjectionSpec`].
//!
//! Payloads are loose JSON objects (they often originate from query strings),
//! so every field is optional and numbers may arrive as strings:
//!
//! ```json
//! { "mode": "dest_hijack", "mag": "30", "target_lat": 12.98, "target_lon": 77.65 }
//! ```
//!
//! Missing fields fall back to `[injection]` defaults. A field that is present
//! but of the wrong type rejects the whole payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::directive::{self, RouteDirective};
use crate::config::InjectionConfig;
use crate::error::{DroneGuardError, Result};
use crate::geo::GeoPoint;

/// Attack mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionMode {
    Jump,
    Speed,
    Heading,
    GpsDrift,
    RouteOverride,
    DestHijack,
    TeleportDest,
    /// Unknown mode name; samples are only tagged as injected
    Unrecognized(String),
}

impl InjectionMode {
    /// Case-insensitive parse. Never fails.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "jump" => Self::Jump,
            "speed" => Self::Speed,
            "heading" => Self::Heading,
            "gps_drift" => Self::GpsDrift,
            "route_override" => Self::RouteOverride,
            "dest_hijack" => Self::DestHijack,
            "teleport_dest" => Self::TeleportDest,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jump => "jump",
            Self::Speed => "speed",
            Self::Heading => "heading",
            Self::GpsDrift => "gps_drift",
            Self::RouteOverride => "route_override",
            Self::DestHijack => "dest_hijack",
            Self::TeleportDest => "teleport_dest",
            Self::Unrecognized(name) => name,
        }
    }

    /// Modes that steer the drone toward an attacker-chosen destination.
    #[must_use]
    pub fn is_hijack(&self) -> bool {
        matches!(self, Self::RouteOverride | Self::DestHijack | Self::TeleportDest)
    }
}

impl std::fmt::Display for InjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a jump is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionStyle {
    /// One instantaneous displacement
    Sudden,
    /// Displacement ramps up over the duration
    Smooth,
}

impl InjectionStyle {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sudden" => Some(Self::Sudden),
            "smooth" => Some(Self::Smooth),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sudden => "sudden",
            Self::Smooth => "smooth",
        }
    }
}

/// Decoded attack parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionSpec {
    pub mode: InjectionMode,
    /// Meters, multiplier, degrees or m/s depending on the mode
    pub magnitude: f64,
    pub style: InjectionStyle,
    /// Requested duration in seconds
    pub duration_s: f64,
    pub directive: Option<RouteDirective>,
    /// The payload as received, echoed back in `injection_detail`
    pub raw: Value,
}

/// Wire form of an active injection, sent alongside each injected sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionSummary {
    pub mode: String,
    pub mag: f64,
    pub style: InjectionStyle,
    pub dur: f64,
    #[serde(default)]
    pub raw: Value,
}

impl InjectionSpec {
    /// Spec built entirely from configured defaults.
    #[must_use]
    pub fn with_defaults(defaults: &InjectionConfig) -> Self {
        Self {
            mode: InjectionMode::parse(&defaults.default_mode),
            magnitude: defaults.default_magnitude,
            style: InjectionStyle::parse(&defaults.default_style).unwrap_or(InjectionStyle::Sudden),
            duration_s: defaults.default_duration_s,
            directive: None,
            raw: Value::Object(Map::new()),
        }
    }

    /// Decodes an attack payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the payload is not an object, or if `mode`,
    /// `style`, `mag` or `dur` is present with an unusable value. A rejected
    /// route directive is not an error; it is logged and skipped.
    pub fn from_payload(payload: &Value, defaults: &InjectionConfig) -> Result<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| DroneGuardError::InvalidPayload("payload is not an object".to_string()))?;

        let mut spec = Self::with_defaults(defaults);
        spec.raw = payload.clone();

        if let Some(value) = object.get("mode") {
            let name = value
                .as_str()
                .ok_or_else(|| DroneGuardError::InvalidPayload("mode must be a string".to_string()))?;
            spec.mode = InjectionMode::parse(name);
            if let InjectionMode::Unrecognized(name) = &spec.mode {
                warn!("Unrecognized injection mode '{}', samples will only be tagged", name);
            }
        }

        if let Some(value) = object.get("style") {
            spec.style = value
                .as_str()
                .and_then(InjectionStyle::parse)
                .ok_or_else(|| DroneGuardError::InvalidPayload(format!("unknown style {}", value)))?;
        }

        if let Some(value) = object.get("mag") {
            spec.magnitude = directive::number(value)
                .ok_or_else(|| DroneGuardError::InvalidPayload(format!("mag is not a number: {}", value)))?;
        }

        if let Some(value) = object.get("dur") {
            spec.duration_s = directive::number(value)
                .ok_or_else(|| DroneGuardError::InvalidPayload(format!("dur is not a number: {}", value)))?;
        }

        let decoded = directive::decode(object);
        for rejection in &decoded.rejected {
            warn!("Ignoring route directive field: {}", rejection);
        }
        spec.directive = decoded.directive;

        Ok(spec)
    }

    /// First point of the route directive, if any.
    #[must_use]
    pub fn explicit_target(&self) -> Option<GeoPoint> {
        self.directive.as_ref().map(RouteDirective::first)
    }

    #[must_use]
    pub fn summary(&self) -> InjectionSummary {
        InjectionSummary {
            mode: self.mode.as_str().to_string(),
            mag: self.magnitude,
            style: self.style,
            dur: self.duration_s,
            raw: self.raw.clone(),
        }
    }
}
