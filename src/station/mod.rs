//! # Ground Station
//!
//! Consumer side of the loop.
//!
//! For every uplink frame the station:
//!
//! 1. decodes the envelope (malformed frames are dropped)
//! 2. runs the signature gate (rejections are broadcast as `signature_fail`)
//! 3. pushes the sample into the history and runs the detectors under the
//!    history lock
//! 4. derives the advisory decision and, with auto-latch on, latches it
//!    into the failsafe authority (off unless configured or switched on with
//!    [`GroundStation::set_auto_latch`])
//! 5. broadcasts the result to observers
//!
//! The station also serves the operator surface (attacks, failsafe, history)
//! and keeps a bounded log of diagnostic events posted by drones.

pub mod attacks;
pub mod control;
pub mod gate;
pub mod observers;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{DetectionConfig, StationConfig};
use crate::detection::DetectorSet;
use crate::error::Result;
use crate::failsafe::{decide, FailsafeAction, FailsafeAuthority, FailsafeSnapshot};
use crate::link::{DiagnosticEvent, ObserverMessage, UplinkMessage};
use crate::telemetry::{TelemetryHistory, TelemetrySample};

pub use attacks::AttackBoard;
pub use control::LocalControl;
pub use gate::{AcceptAll, RequireSignature, SignatureGate};
pub use observers::{Observer, ObserverHub};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frame counters and the current auto-latch mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StationStats {
    pub frames: u64,
    pub dropped: u64,
    pub hellos: u64,
    pub signature_failures: u64,
    pub auto_latch: bool,
}

#[derive(Debug, Default)]
struct Counters {
    frames: AtomicU64,
    dropped: AtomicU64,
    hellos: AtomicU64,
    signature_failures: AtomicU64,
}

pub struct GroundStation {
    config: StationConfig,
    history: Mutex<TelemetryHistory>,
    detectors: DetectorSet,
    failsafe: FailsafeAuthority,
    attacks: AttackBoard,
    observers: ObserverHub,
    events: Mutex<VecDeque<DiagnosticEvent>>,
    gate: Box<dyn SignatureGate>,
    auto_latch: AtomicBool,
    counters: Counters,
}

impl GroundStation {
    /// Station with the standard detectors.
    ///
    /// The gate is [`RequireSignature`] when `require_signature` is set,
    /// otherwise [`AcceptAll`].
    #[must_use]
    pub fn new(config: &StationConfig, detection: &DetectionConfig) -> Self {
        let gate: Box<dyn SignatureGate> = if config.require_signature {
            Box::new(RequireSignature)
        } else {
            Box::new(AcceptAll)
        };
        Self {
            config: config.clone(),
            history: Mutex::new(TelemetryHistory::new(config.history_capacity)),
            detectors: DetectorSet::standard(detection),
            failsafe: FailsafeAuthority::new(),
            attacks: AttackBoard::new(),
            observers: ObserverHub::new(config.observer_buffer),
            events: Mutex::new(VecDeque::with_capacity(config.event_log_capacity)),
            gate,
            auto_latch: AtomicBool::new(config.auto_latch),
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn with_gate<G: SignatureGate + 'static>(mut self, gate: G) -> Self {
        self.gate = Box::new(gate);
        self
    }

    #[must_use]
    pub fn with_detectors(mut self, detectors: DetectorSet) -> Self {
        self.detectors = detectors;
        self
    }

    /// Processes one uplink frame without broadcasting.
    ///
    /// Returns the observer envelope the frame produced, or `None` for
    /// malformed frames and hellos.
    pub fn ingest(&self, frame: &str) -> Option<ObserverMessage> {
        self.counters.frames.fetch_add(1, Ordering::Relaxed);

        let message = match UplinkMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Dropping malformed frame: {}", e);
                return None;
            }
        };

        match message {
            UplinkMessage::Hello { drone_id, time } => {
                self.counters.hellos.fetch_add(1, Ordering::Relaxed);
                info!("Drone '{}' connected (t={:.3})", drone_id, time);
                None
            }
            UplinkMessage::Telemetry {
                payload,
                injection_detail,
            } => Some(self.ingest_sample(payload, injection_detail)),
        }
    }

    fn ingest_sample(
        &self,
        payload: TelemetrySample,
        injection_detail: Option<crate::injection::InjectionSummary>,
    ) -> ObserverMessage {
        if !self.gate.verify(&payload) {
            self.counters.signature_failures.fetch_add(1, Ordering::Relaxed);
            warn!("Signature check failed for sample at t={:.3}", payload.time);
            return ObserverMessage::SignatureFail { payload };
        }

        let report = {
            let mut history = lock(&self.history);
            history.push(payload.clone());
            self.detectors.evaluate(&payload, &history)
        };

        for alert in &report.alerts {
            debug!("Alert {} ({:?}): {}", alert.kind, alert.severity, alert.detail);
        }

        let decision = decide(&report.alerts);
        if self.auto_latch() && decision.action != FailsafeAction::None && !self.failsafe.is_active() {
            let reason = decision.reason.as_deref().unwrap_or("DETECTOR");
            self.failsafe.activate_with(decision.action, reason);
        }

        ObserverMessage::Telemetry {
            payload,
            alerts: report.alerts,
            faults: report.faults,
            failsafe: self.failsafe.snapshot(),
            decision,
            injection_detail,
        }
    }

    /// Processes one frame and broadcasts the outcome.
    pub fn handle_frame(&self, frame: &str) -> Option<ObserverMessage> {
        let message = self.ingest(frame)?;
        self.observers.broadcast(&message);
        Some(message)
    }

    /// Consumes frames until every sender is gone.
    pub async fn serve(self: Arc<Self>, mut frames: mpsc::Receiver<String>) {
        info!("Ground station accepting telemetry");
        while let Some(frame) = frames.recv().await {
            self.handle_frame(&frame);
        }
        info!("Telemetry uplink closed");
    }

    pub fn subscribe(&self) -> Observer {
        self.observers.subscribe()
    }

    #[must_use]
    pub fn observers(&self) -> &ObserverHub {
        &self.observers
    }

    // Operator surface

    pub fn launch_attack(&self, payload: Value) -> Result<Value> {
        self.attacks.launch(payload)
    }

    pub fn clear_attacks(&self) -> usize {
        self.attacks.clear()
    }

    #[must_use]
    pub fn list_attacks(&self) -> Vec<Value> {
        self.attacks.list()
    }

    #[must_use]
    pub fn latest_attack(&self) -> Option<Value> {
        self.attacks.latest()
    }

    #[must_use]
    pub fn attack_active(&self) -> bool {
        self.attacks.is_active()
    }

    /// Switches automatic latching of detector decisions on or off.
    pub fn set_auto_latch(&self, enabled: bool) {
        let previous = self.auto_latch.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            info!("Failsafe auto-latch {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    #[must_use]
    pub fn auto_latch(&self) -> bool {
        self.auto_latch.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failsafe(&self) -> &FailsafeAuthority {
        &self.failsafe
    }

    /// Latches HOLD and tells observers.
    pub fn activate_failsafe(&self, reason: &str) -> FailsafeSnapshot {
        self.activate_failsafe_with(FailsafeAction::Hold, reason)
    }

    pub fn activate_failsafe_with(&self, action: FailsafeAction, reason: &str) -> FailsafeSnapshot {
        let snapshot = self.failsafe.activate_with(action, reason);
        self.observers.broadcast(&ObserverMessage::Failsafe {
            failsafe: snapshot.clone(),
        });
        snapshot
    }

    pub fn deactivate_failsafe(&self) -> FailsafeSnapshot {
        let snapshot = self.failsafe.deactivate();
        self.observers.broadcast(&ObserverMessage::Failsafe {
            failsafe: snapshot.clone(),
        });
        snapshot
    }

    pub fn reset_failsafe(&self) {
        self.failsafe.reset();
        self.observers.broadcast(&ObserverMessage::Failsafe {
            failsafe: self.failsafe.snapshot(),
        });
    }

    /// Appends to the diagnostic log and forwards to observers.
    pub fn record_event(&self, event: DiagnosticEvent) {
        info!("Diagnostic event '{}': {:?}", event.event, event.reason);
        {
            let mut events = lock(&self.events);
            if events.len() >= self.config.event_log_capacity.max(1) {
                events.pop_front();
            }
            events.push_back(event.clone());
        }
        self.observers.broadcast(&ObserverMessage::Diagnostic { event });
    }

    /// Diagnostic log, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        lock(&self.events).iter().cloned().collect()
    }

    #[must_use]
    pub fn history_newest_first(&self) -> Vec<TelemetrySample> {
        lock(&self.history).newest_first()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        lock(&self.history).len()
    }

    #[must_use]
    pub fn stats(&self) -> StationStats {
        StationStats {
            frames: self.counters.frames.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            hellos: self.counters.hellos.load(Ordering::Relaxed),
            signature_failures: self.counters.signature_failures.load(Ordering::Relaxed),
            auto_latch: self.auto_latch(),
        }
    }
}

impl std::fmt::Debug for GroundStation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundStation")
            .field("config", &self.config)
            .field("detectors", &self.detectors)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
