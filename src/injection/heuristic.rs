//! # Local Auto-Failsafe Heuristic
//!
//! Drone-side check that declares an emergency as soon as an active injection
//! looks dangerous, without waiting for the ground station to confirm.
//!
//! Rules are evaluated in order and the first hit wins:
//!
//! | Rule    | Modes                                         | Fires when                          |
//! |---------|-----------------------------------------------|-------------------------------------|
//! | jump    | `jump`                                        | displacement or magnitude ≥ 20 m    |
//! | speed   | `speed`                                       | multiplier ≥ 3.0                    |
//! | heading | `heading`                                     | \|offset\| ≥ 90°                    |
//! | hijack  | `route_override`, `dest_hijack`, `teleport_dest` | target ≥ 20 m from the drone     |
//! | drift   | `gps_drift`                                   | drift rate ≥ 10 m/s                 |

use std::fmt;

use super::spec::{InjectionMode, InjectionSpec};
use crate::config::HeuristicConfig;
use crate::geo::{self, GeoPoint};
use crate::telemetry::TelemetrySample;

/// Which rule fired, with the measured value.
///
/// `Display` produces the reason string sent to the failsafe authority.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalTrigger {
    Jump { displacement_m: f64 },
    Speed { multiplier: f64 },
    Heading { offset_deg: f64 },
    Hijack { distance_m: f64 },
    Drift { rate_mps: f64 },
}

impl fmt::Display for LocalTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jump { displacement_m } => write!(f, "AUTO_FAILSAFE_JUMP_{}m", *displacement_m as i64),
            Self::Speed { multiplier } => write!(f, "AUTO_FAILSAFE_SPEED_x{}", multiplier),
            Self::Heading { offset_deg } => write!(f, "AUTO_FAILSAFE_HEADING_{}deg", *offset_deg as i64),
            Self::Hijack { distance_m } => write!(f, "AUTO_FAILSAFE_HIJACK_{}m", *distance_m as i64),
            Self::Drift { rate_mps } => write!(f, "AUTO_FAILSAFE_DRIFT_{}", rate_mps),
        }
    }
}

/// Threshold-based trigger over the active injection.
#[derive(Debug, Clone)]
pub struct LocalFailsafeHeuristic {
    thresholds: HeuristicConfig,
}

impl LocalFailsafeHeuristic {
    #[must_use]
    pub fn new(thresholds: HeuristicConfig) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> &HeuristicConfig {
        &self.thresholds
    }

    /// Checks the injected sample against the rule for `spec.mode`.
    ///
    /// # Arguments
    ///
    /// * `spec` - The active injection
    /// * `before` - True position before this tick's step
    /// * `after` - The injected sample about to be sent
    #[must_use]
    pub fn evaluate(
        &self,
        spec: &InjectionSpec,
        before: GeoPoint,
        after: &TelemetrySample,
    ) -> Option<LocalTrigger> {
        let t = &self.thresholds;
        match spec.mode {
            InjectionMode::Jump => {
                let displacement = after
                    .position()
                    .map(|p| geo::distance(before, p))
                    .unwrap_or(0.0);
                if displacement >= t.jump_threshold_m {
                    Some(LocalTrigger::Jump {
                        displacement_m: displacement,
                    })
                } else if spec.magnitude >= t.jump_threshold_m {
                    Some(LocalTrigger::Jump {
                        displacement_m: spec.magnitude,
                    })
                } else {
                    None
                }
            }
            InjectionMode::Speed => (spec.magnitude >= t.speed_multiplier_threshold).then(|| LocalTrigger::Speed {
                multiplier: spec.magnitude,
            }),
            InjectionMode::Heading => {
                (spec.magnitude.abs() >= t.heading_shift_threshold_deg).then(|| LocalTrigger::Heading {
                    offset_deg: spec.magnitude,
                })
            }
            InjectionMode::RouteOverride | InjectionMode::DestHijack | InjectionMode::TeleportDest => {
                let target = spec.explicit_target()?;
                let distance = geo::distance(before, target);
                (distance >= t.hijack_distance_m).then_some(LocalTrigger::Hijack { distance_m: distance })
            }
            InjectionMode::GpsDrift => (spec.magnitude >= t.drift_rate_threshold_mps).then(|| LocalTrigger::Drift {
                rate_mps: spec.magnitude,
            }),
            InjectionMode::Unrecognized(_) => None,
        }
    }
}
