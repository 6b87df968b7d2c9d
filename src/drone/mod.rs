//! # Drone Producer
//!
//! Producer side of the loop: owns the flight generator, the injection engine
//! and the local heuristic, and turns each telemetry tick into an uplink frame.
//!
//! [`DroneProducer`] is synchronous state; [`runner`] drives it from three
//! tokio intervals and talks to the station.
//!
//! ## Tick
//!
//! - frozen: emit a `failsafe` sample at the current position
//! - otherwise step the generator, apply the active injection, then
//!   - if the heuristic fires: emit this tick's injected sample, freeze, stop
//!     the injection, clear the override route and hand back an
//!     [`Escalation`] for the runner to send
//!   - if the injection expired: stop it, clear the override route and tag
//!     the sample `normal`

pub mod runner;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Config, InjectionConfig};
use crate::error::Result;
use crate::failsafe::FailsafeSnapshot;
use crate::flight::{FlightParams, FlightPathGenerator};
use crate::injection::{InjectionEngine, InjectionSpec, LocalFailsafeHeuristic, LocalTrigger};
use crate::link::{DiagnosticEvent, UplinkMessage};
use crate::telemetry::SampleSource;

pub use runner::{run, run_session};

/// Request for the station produced by a local trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub trigger: LocalTrigger,
    /// Reason string sent with the activation request
    pub reason: String,
    pub event: DiagnosticEvent,
}

/// Output of one telemetry tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub message: UplinkMessage,
    pub escalation: Option<Escalation>,
}

#[derive(Debug)]
pub struct DroneProducer {
    drone_id: String,
    generator: FlightPathGenerator,
    engine: InjectionEngine,
    heuristic: LocalFailsafeHeuristic,
    injection_defaults: InjectionConfig,
    rng: StdRng,
    tick_interval_s: f64,
    last_tick: Option<f64>,
    frozen: bool,
}

impl DroneProducer {
    pub fn from_config(config: &Config) -> Result<Self> {
        let params = FlightParams {
            cruise_speed_mps: config.flight.cruise_speed_mps,
            altitude_m: config.flight.altitude_m,
            battery_drain_per_sec: config.flight.battery_drain_per_sec,
            seed: config.flight.seed,
        };
        let generator = FlightPathGenerator::with_waypoints(config.flight.route_points(), params)?;
        let tick_interval_s = config.timing.telemetry_interval_s();

        Ok(Self::new(
            &config.flight.drone_id,
            generator,
            InjectionEngine::new(tick_interval_s),
            LocalFailsafeHeuristic::new(config.heuristic.clone()),
            config.injection.clone(),
            tick_interval_s,
        ))
    }

    #[must_use]
    pub fn new(
        drone_id: &str,
        generator: FlightPathGenerator,
        engine: InjectionEngine,
        heuristic: LocalFailsafeHeuristic,
        injection_defaults: InjectionConfig,
        tick_interval_s: f64,
    ) -> Self {
        let rng = match generator.params().seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self {
            drone_id: drone_id.to_string(),
            generator,
            engine,
            heuristic,
            injection_defaults,
            rng,
            tick_interval_s,
            last_tick: None,
            frozen: false,
        }
    }

    #[must_use]
    pub fn hello(&self, now: f64) -> UplinkMessage {
        UplinkMessage::Hello {
            drone_id: self.drone_id.clone(),
            time: now,
        }
    }

    /// Produces the sample for this tick.
    pub fn tick(&mut self, now: f64) -> TickOutput {
        let dt = match self.last_tick {
            Some(last) => (now - last).max(1e-6),
            None => self.tick_interval_s,
        };
        self.last_tick = Some(now);

        if self.frozen {
            return TickOutput {
                message: UplinkMessage::telemetry(self.generator.frozen_sample(now), None),
                escalation: None,
            };
        }

        let before = self.generator.position();
        let raw = self.generator.step(dt, None, now);

        if !self.engine.is_active() {
            return TickOutput {
                message: UplinkMessage::telemetry(raw, None),
                escalation: None,
            };
        }

        let detail = self.engine.summary();
        let mut sample = self.engine.apply(raw, &mut self.generator, &mut self.rng, now);

        let trigger = self
            .engine
            .spec()
            .and_then(|spec| self.heuristic.evaluate(spec, before, &sample));

        if let Some(trigger) = trigger {
            let reason = trigger.to_string();
            warn!("Local auto-failsafe: {}, requesting remote activation", reason);
            let attack = self.engine.spec().map(|spec| spec.raw.clone());
            let event = DiagnosticEvent::auto_failsafe(&reason, attack, now);

            self.frozen = true;
            self.engine.stop();
            self.generator.clear_override_route();

            return TickOutput {
                message: UplinkMessage::telemetry(sample, detail),
                escalation: Some(Escalation { trigger, reason, event }),
            };
        }

        if self.engine.is_expired(now) {
            info!("Injection expired");
            self.engine.stop();
            self.generator.clear_override_route();
            sample.source = SampleSource::Normal;
        }

        TickOutput {
            message: UplinkMessage::telemetry(sample, detail),
            escalation: None,
        }
    }

    /// Whether an attack poll should also fetch the attack details.
    #[must_use]
    pub fn wants_attack_details(&self) -> bool {
        !self.engine.is_active() && !self.frozen
    }

    /// Applies the result of an attack poll.
    ///
    /// Starts an injection when an attack is active and none is running,
    /// using `details` or, if they are missing or unusable, the configured
    /// defaults. Stops the injection when no attack is active.
    pub fn on_attack_poll(&mut self, active: bool, details: Option<Value>, now: f64) {
        if active {
            if !self.wants_attack_details() {
                return;
            }
            let spec = match details {
                Some(payload) => InjectionSpec::from_payload(&payload, &self.injection_defaults).unwrap_or_else(|e| {
                    warn!("Unusable attack payload ({}), using defaults", e);
                    InjectionSpec::with_defaults(&self.injection_defaults)
                }),
                None => InjectionSpec::with_defaults(&self.injection_defaults),
            };
            self.engine.start(spec, now);
        } else if self.engine.is_active() {
            self.engine.stop();
            self.generator.clear_override_route();
        }
    }

    /// Applies the station's failsafe state.
    ///
    /// Active freezes the drone. Inactive releases a freeze, including one
    /// the local heuristic set before the station caught up.
    pub fn on_failsafe_poll(&mut self, state: &FailsafeSnapshot) {
        if state.active {
            if !self.frozen {
                warn!(
                    "Station failsafe {} ({}), holding position",
                    state.action,
                    state.reason.as_deref().unwrap_or("no reason")
                );
            }
            self.frozen = true;
            self.engine.stop();
            self.generator.clear_override_route();
        } else if self.frozen {
            info!("Station failsafe released, resuming route");
            self.frozen = false;
        }
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn drone_id(&self) -> &str {
        &self.drone_id
    }

    #[must_use]
    pub fn generator(&self) -> &FlightPathGenerator {
        &self.generator
    }

    #[must_use]
    pub fn engine(&self) -> &InjectionEngine {
        &self.engine
    }
}
