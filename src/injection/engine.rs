//! # Injection Engine
//!
//! Applies the active attack to each sample the flight generator produces.
//!
//! The engine is either inactive (samples pass through untouched) or holds one
//! [`InjectionSpec`] plus the per-attack state it needs across ticks: whether a
//! sudden jump or teleport already fired, the origin of a smooth jump, and the
//! accumulated GPS drift offset. `stop()` discards all of it.

use rand::Rng;
use tracing::{debug, info, warn};

use super::directive::RouteDirective;
use super::spec::{InjectionMode, InjectionSpec, InjectionStyle, InjectionSummary};
use crate::flight::FlightPathGenerator;
use crate::geo::{self, GeoPoint};
use crate::telemetry::{SampleSource, TelemetrySample};

/// Shortest duration an injection lasts, in seconds.
pub const MIN_INJECTION_DURATION_S: f64 = 0.5;

/// Degrees per second the smooth-jump bearing sweeps.
const SMOOTH_SWEEP_DEG_PER_S: f64 = 150.0;

#[derive(Debug)]
struct ActiveInjection {
    spec: InjectionSpec,
    started_at: f64,
    jumped: bool,
    teleported: bool,
    route_installed: bool,
    smooth_origin: Option<GeoPoint>,
    /// Accumulated (east, north) drift in meters
    drift: (f64, f64),
}

/// Stateful applier of one injection at a time.
#[derive(Debug)]
pub struct InjectionEngine {
    active: Option<ActiveInjection>,
    tick_interval_s: f64,
}

impl InjectionEngine {
    /// # Arguments
    ///
    /// * `tick_interval_s` - Nominal telemetry interval; scales the per-tick GPS drift step
    #[must_use]
    pub fn new(tick_interval_s: f64) -> Self {
        Self {
            active: None,
            tick_interval_s,
        }
    }

    /// Activates `spec`, replacing any running injection.
    pub fn start(&mut self, spec: InjectionSpec, now: f64) {
        info!(
            "Injection started: mode={} mag={} style={} dur={}s",
            spec.mode,
            spec.magnitude,
            spec.style.as_str(),
            spec.duration_s
        );
        self.active = Some(ActiveInjection {
            spec,
            started_at: now,
            jumped: false,
            teleported: false,
            route_installed: false,
            smooth_origin: None,
            drift: (0.0, 0.0),
        });
    }

    /// Deactivates and forgets all per-attack state. Idempotent.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            info!("Injection stopped: mode={}", active.spec.mode);
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn spec(&self) -> Option<&InjectionSpec> {
        self.active.as_ref().map(|a| &a.spec)
    }

    #[must_use]
    pub fn started_at(&self) -> Option<f64> {
        self.active.as_ref().map(|a| a.started_at)
    }

    /// True when inactive, or when more than `max(0.5, duration)` seconds
    /// have passed since `start`.
    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        match &self.active {
            None => true,
            Some(active) => now - active.started_at > active.spec.duration_s.max(MIN_INJECTION_DURATION_S),
        }
    }

    #[must_use]
    pub fn summary(&self) -> Option<InjectionSummary> {
        self.spec().map(InjectionSpec::summary)
    }

    /// Distorts `sample` according to the active injection.
    ///
    /// Returns the sample unchanged when inactive. Otherwise the returned
    /// sample is always tagged `injected`.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        mut sample: TelemetrySample,
        generator: &mut FlightPathGenerator,
        rng: &mut R,
        now: f64,
    ) -> TelemetrySample {
        let tick_interval_s = self.tick_interval_s;
        let Some(active) = self.active.as_mut() else {
            return sample;
        };
        sample.source = SampleSource::Injected;

        let spec = &active.spec;
        let teleport_target = match (&spec.mode, &spec.directive) {
            (InjectionMode::TeleportDest, Some(RouteDirective::Target(target))) => Some(*target),
            _ => None,
        };

        // A route directive replaces the per-mode math
        if let (Some(directive), None) = (&spec.directive, teleport_target) {
            if !active.route_installed && !generator.has_override() {
                match generator.set_override_route(directive.points()) {
                    Ok(()) => active.route_installed = true,
                    Err(e) => warn!("Could not install override route: {}", e),
                }
            }
            return sample;
        }

        let Some(position) = sample.position() else {
            return sample;
        };
        let elapsed = (now - active.started_at).max(0.0);

        match (&spec.mode, spec.style) {
            (InjectionMode::Jump, InjectionStyle::Sudden) => {
                if !active.jumped {
                    let bearing = rng.gen_range(0.0..360.0);
                    sample.set_position(geo::destination(position, bearing, spec.magnitude));
                    sample.zero_velocity();
                    active.jumped = true;
                    debug!("Sudden jump of {} m at bearing {:.1}", spec.magnitude, bearing);
                }
            }
            (InjectionMode::Jump, InjectionStyle::Smooth) => {
                let origin = *active.smooth_origin.get_or_insert(position);
                let duration = spec.duration_s.max(0.001);
                let fraction = (elapsed / duration).min(1.0);
                let bearing = (elapsed * SMOOTH_SWEEP_DEG_PER_S).rem_euclid(360.0);
                sample.set_position(geo::destination(origin, bearing, spec.magnitude * fraction));
            }
            (InjectionMode::Speed, _) => {
                let multiplier = if spec.magnitude > 0.0 { spec.magnitude } else { 1.0 };
                sample.speed *= multiplier;
                sample.vx *= multiplier;
                sample.vy *= multiplier;
            }
            (InjectionMode::Heading, _) => {
                sample.yaw = geo::normalize_bearing(sample.yaw + spec.magnitude);
            }
            (InjectionMode::GpsDrift, _) => {
                let bearing: f64 = rng.gen_range(0.0..360.0);
                let step = spec.magnitude * tick_interval_s;
                active.drift.0 += step * bearing.to_radians().sin();
                active.drift.1 += step * bearing.to_radians().cos();
                let (east, north) = active.drift;
                let offset = east.hypot(north);
                if offset > 0.0 {
                    sample.set_position(geo::destination(
                        position,
                        geo::heading_from_velocity(east, north),
                        offset,
                    ));
                }
            }
            (InjectionMode::TeleportDest, _) => {
                if let Some(target) = teleport_target {
                    if !active.teleported {
                        sample.set_position(target);
                        sample.zero_velocity();
                        active.teleported = true;
                        info!("Teleported to ({:.7}, {:.7})", target.lat, target.lon);
                    }
                }
            }
            (InjectionMode::RouteOverride | InjectionMode::DestHijack | InjectionMode::Unrecognized(_), _) => {}
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectionConfig;
    use crate::flight::FlightParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    const NOW: f64 = 1_700_000_000.0;
    const HOME: GeoPoint = GeoPoint::new(12.9718915, 77.6411545);

    fn generator() -> FlightPathGenerator {
        FlightPathGenerator::with_waypoints(
            vec![HOME, GeoPoint::new(12.9725, 77.6420), GeoPoint::new(12.9731, 77.6399)],
            FlightParams {
                seed: Some(3),
                ..FlightParams::default()
            },
        )
        .unwrap()
    }

    fn spec(payload: serde_json::Value) -> InjectionSpec {
        InjectionSpec::from_payload(&payload, &InjectionConfig::default()).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn test_inactive_passes_through() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        let sample = generator.step(1.0, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert_eq!(out, sample);
        assert!(engine.is_expired(NOW));
        assert!(engine.summary().is_none());
    }

    #[test]
    fn test_sudden_jump_fires_once() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        let mut rng = rng();
        engine.start(spec(json!({ "mode": "jump", "mag": 50, "style": "sudden" })), NOW);

        let sample = generator.step(0.25, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng, NOW);
        let moved = geo::distance(sample.position().unwrap(), out.position().unwrap());
        assert!((moved - 50.0).abs() < 1e-6, "moved {} m", moved);
        assert_eq!((out.vx, out.vy, out.speed), (0.0, 0.0, 0.0));
        assert_eq!(out.source, SampleSource::Injected);

        let next = generator.step(0.25, None, NOW + 0.25);
        let out = engine.apply(next.clone(), &mut generator, &mut rng, NOW + 0.25);
        assert_eq!(out.position(), next.position());
        assert_eq!(out.source, SampleSource::Injected);
    }

    #[test]
    fn test_smooth_jump_ramps() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        let mut rng = rng();
        engine.start(spec(json!({ "mode": "jump", "mag": 40, "style": "smooth", "dur": 4 })), NOW);

        let first = generator.step(0.25, None, NOW);
        let origin = first.position().unwrap();
        let out = engine.apply(first, &mut generator, &mut rng, NOW);
        assert!(geo::distance(origin, out.position().unwrap()) < 1e-6);

        let half = generator.step(0.25, None, NOW + 2.0);
        let out = engine.apply(half, &mut generator, &mut rng, NOW + 2.0);
        assert!((geo::distance(origin, out.position().unwrap()) - 20.0).abs() < 1e-6);

        let full = generator.step(0.25, None, NOW + 6.0);
        let out = engine.apply(full, &mut generator, &mut rng, NOW + 6.0);
        assert!((geo::distance(origin, out.position().unwrap()) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_speed_multiplier() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        engine.start(spec(json!({ "mode": "speed", "mag": 4 })), NOW);

        let sample = generator.step(1.0, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert!((out.speed - sample.speed * 4.0).abs() < 1e-9);
        assert!((out.vx - sample.vx * 4.0).abs() < 1e-9);
        assert!((out.vy - sample.vy * 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_speed_multiplier_is_identity() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        engine.start(spec(json!({ "mode": "speed", "mag": -2 })), NOW);

        let sample = generator.step(1.0, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert_eq!(out.speed, sample.speed);
    }

    #[test]
    fn test_heading_offset_wraps() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        engine.start(spec(json!({ "mode": "heading", "mag": 350 })), NOW);

        let sample = generator.step(1.0, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert!((0.0..360.0).contains(&out.yaw));
        assert!((geo::wrap_angle_diff(out.yaw, sample.yaw) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_gps_drift_accumulates() {
        let mut engine = InjectionEngine::new(1.0);
        let mut generator = generator();
        let mut rng = rng();
        engine.start(spec(json!({ "mode": "gps_drift", "mag": 5 })), NOW);

        let sample = generator.step(1.0, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng, NOW);
        let offset = geo::distance(sample.position().unwrap(), out.position().unwrap());
        assert!((offset - 5.0).abs() < 1e-6, "offset {}", offset);

        for i in 1..10 {
            let sample = generator.step(1.0, None, NOW + i as f64);
            let out = engine.apply(sample.clone(), &mut generator, &mut rng, NOW + i as f64);
            let offset = geo::distance(sample.position().unwrap(), out.position().unwrap());
            assert!(offset <= 5.0 * (i + 1) as f64 + 1e-6);
        }
    }

    #[test]
    fn test_route_directive_installs_override_once() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        let target = GeoPoint::new(12.9800, 77.6500);
        engine.start(
            spec(json!({ "mode": "dest_hijack", "target_lat": target.lat, "target_lon": target.lon })),
            NOW,
        );

        let sample = generator.step(0.25, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert_eq!(out.position(), sample.position());
        assert_eq!(out.source, SampleSource::Injected);
        assert_eq!(generator.override_points(), Some(&[target][..]));

        // Operator-cleared overrides are not reinstalled by the same injection
        generator.clear_override_route();
        let sample = generator.step(0.25, None, NOW + 0.25);
        engine.apply(sample, &mut generator, &mut rng(), NOW + 0.25);
        assert!(!generator.has_override());
    }

    #[test]
    fn test_directive_supersedes_jump_math() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        engine.start(
            spec(json!({ "mode": "jump", "mag": 500, "waypoints": [[12.98, 77.65], [12.99, 77.66]] })),
            NOW,
        );

        let sample = generator.step(0.25, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert_eq!(out.position(), sample.position());
        assert_eq!(generator.override_points().map(<[GeoPoint]>::len), Some(2));
    }

    #[test]
    fn test_route_override_without_directive_only_tags() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        engine.start(spec(json!({ "mode": "route_override" })), NOW);

        let sample = generator.step(0.25, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert_eq!(out.position(), sample.position());
        assert_eq!(out.source, SampleSource::Injected);
        assert!(!generator.has_override());
    }

    #[test]
    fn test_teleport_is_one_shot() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        let target = GeoPoint::new(12.9800, 77.6500);
        engine.start(spec(json!({ "mode": "teleport_dest", "lat": target.lat, "lon": target.lon })), NOW);

        let sample = generator.step(0.25, None, NOW);
        let out = engine.apply(sample, &mut generator, &mut rng(), NOW);
        assert_eq!(out.position(), Some(target));
        assert_eq!(out.speed, 0.0);
        assert!(!generator.has_override());

        let sample = generator.step(0.25, None, NOW + 0.25);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW + 0.25);
        assert_eq!(out.position(), sample.position());
    }

    #[test]
    fn test_unrecognized_mode_only_tags() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        engine.start(spec(json!({ "mode": "warp", "mag": 100 })), NOW);

        let sample = generator.step(0.25, None, NOW);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng(), NOW);
        assert_eq!(out.position(), sample.position());
        assert_eq!(out.speed, sample.speed);
        assert_eq!(out.source, SampleSource::Injected);
    }

    #[test]
    fn test_expiry_uses_duration_floor() {
        let mut engine = InjectionEngine::new(0.25);
        engine.start(spec(json!({ "mode": "speed", "mag": 4, "dur": 0.1 })), NOW);
        assert!(!engine.is_expired(NOW + 0.3));
        assert!(!engine.is_expired(NOW + 0.5));
        assert!(engine.is_expired(NOW + 0.51));

        engine.start(spec(json!({ "mode": "speed", "mag": 4, "dur": 2 })), NOW);
        assert!(!engine.is_expired(NOW + 2.0));
        assert!(engine.is_expired(NOW + 2.01));
    }

    #[test]
    fn test_stop_resets_state() {
        let mut engine = InjectionEngine::new(0.25);
        let mut generator = generator();
        let mut rng = rng();
        let jump = spec(json!({ "mode": "jump", "mag": 50 }));
        engine.start(jump.clone(), NOW);
        let sample = generator.step(0.25, None, NOW);
        engine.apply(sample, &mut generator, &mut rng, NOW);

        engine.stop();
        engine.stop();
        assert!(!engine.is_active());
        assert!(engine.spec().is_none());

        // A fresh start jumps again
        engine.start(jump, NOW + 1.0);
        let sample = generator.step(0.25, None, NOW + 1.0);
        let out = engine.apply(sample.clone(), &mut generator, &mut rng, NOW + 1.0);
        let moved = geo::distance(sample.position().unwrap(), out.position().unwrap());
        assert!((moved - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_while_active() {
        let mut engine = InjectionEngine::new(0.25);
        engine.start(spec(json!({ "mode": "heading", "mag": 120 })), NOW);
        let summary = engine.summary().unwrap();
        assert_eq!(summary.mode, "heading");
        assert_eq!(summary.mag, 120.0);
        assert_eq!(engine.started_at(), Some(NOW));
    }
}
