//! Maps a batch of alerts to the failsafe action to recommend.
//!
//! Priority, first match wins:
//!
//! 1. `GPS_SPOOF`, `GPS_JAMMING` → HOLD
//! 2. `IMPOSSIBLE_MOVEMENT`, `IMU_HEADING_MISMATCH`, `YAW_JUMP`, `IMU_SPIKE` → LAND
//! 3. any other high-severity alert → KILL
//! 4. otherwise → NONE

use serde::{Deserialize, Serialize};

use super::state::FailsafeAction;
use crate::detection::{AlertKind, AnomalyAlert, Severity};

/// Advisory outcome of [`decide`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: FailsafeAction,
    /// Alert kind that drove the decision
    pub reason: Option<String>,
}

impl Decision {
    fn from_alert(action: FailsafeAction, alert: &AnomalyAlert) -> Self {
        Self {
            action,
            reason: Some(alert.kind.as_str().to_string()),
        }
    }
}

const HOLD_KINDS: [AlertKind; 2] = [AlertKind::GpsSpoof, AlertKind::GpsJamming];

const LAND_KINDS: [AlertKind; 4] = [
    AlertKind::ImpossibleMovement,
    AlertKind::ImuHeadingMismatch,
    AlertKind::YawJump,
    AlertKind::ImuSpike,
];

#[must_use]
pub fn decide(alerts: &[AnomalyAlert]) -> Decision {
    if let Some(alert) = alerts.iter().find(|a| HOLD_KINDS.contains(&a.kind)) {
        return Decision::from_alert(FailsafeAction::Hold, alert);
    }
    if let Some(alert) = alerts.iter().find(|a| LAND_KINDS.contains(&a.kind)) {
        return Decision::from_alert(FailsafeAction::Land, alert);
    }
    if let Some(alert) = alerts.iter().find(|a| a.severity == Severity::High) {
        return Decision::from_alert(FailsafeAction::Kill, alert);
    }
    Decision::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert(kind: AlertKind, severity: Severity) -> AnomalyAlert {
        AnomalyAlert::new(kind, severity, json!({}))
    }

    #[test]
    fn test_no_alerts() {
        assert_eq!(decide(&[]), Decision::default());
        assert_eq!(decide(&[]).action, FailsafeAction::None);
    }

    #[test]
    fn test_spoof_holds() {
        let decision = decide(&[alert(AlertKind::GpsSpoof, Severity::High)]);
        assert_eq!(decision.action, FailsafeAction::Hold);
        assert_eq!(decision.reason.as_deref(), Some("GPS_SPOOF"));
    }

    #[test]
    fn test_hold_beats_land() {
        let decision = decide(&[
            alert(AlertKind::ImpossibleMovement, Severity::High),
            alert(AlertKind::GpsJamming, Severity::High),
        ]);
        assert_eq!(decision.action, FailsafeAction::Hold);
        assert_eq!(decision.reason.as_deref(), Some("GPS_JAMMING"));
    }

    #[test]
    fn test_land_kinds() {
        for kind in [
            AlertKind::ImpossibleMovement,
            AlertKind::ImuHeadingMismatch,
            AlertKind::YawJump,
            AlertKind::ImuSpike,
        ] {
            assert_eq!(decide(&[alert(kind, Severity::Medium)]).action, FailsafeAction::Land);
        }
    }

    #[test]
    fn test_unknown_high_severity_kills() {
        let decision = decide(&[alert(AlertKind::Other("RF_INTERFERENCE".to_string()), Severity::High)]);
        assert_eq!(decision.action, FailsafeAction::Kill);
        assert_eq!(decision.reason.as_deref(), Some("RF_INTERFERENCE"));
    }

    #[test]
    fn test_unknown_low_severity_is_none() {
        let decision = decide(&[alert(AlertKind::Other("BATTERY_SAG".to_string()), Severity::Medium)]);
        assert_eq!(decision, Decision::default());
    }
}
