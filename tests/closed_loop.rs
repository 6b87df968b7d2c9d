use drone_guard::config::{Config, DetectionConfig, HeuristicConfig, InjectionConfig, StationConfig};
use drone_guard::detection::{AlertKind, DetectorSet};
use drone_guard::drone::DroneProducer;
use drone_guard::failsafe::{decide, FailsafeAction, FailsafeAuthority, FailsafeEventKind};
use drone_guard::flight::{FlightParams, FlightPathGenerator};
use drone_guard::geo::{self, GeoPoint, METERS_PER_DEGREE};
use drone_guard::injection::{InjectionEngine, InjectionSpec, LocalFailsafeHeuristic, LocalTrigger};
use drone_guard::link::{ObserverMessage, UplinkMessage};
use drone_guard::station::GroundStation;
use drone_guard::telemetry::{SampleSource, TelemetryHistory, TelemetrySample};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

const HOME: GeoPoint = GeoPoint::new(12.9718915, 77.6411545);
const T0: f64 = 1_700_000_000.0;

fn generator() -> FlightPathGenerator {
    FlightPathGenerator::with_waypoints(
        vec![HOME, GeoPoint::new(12.9725, 77.6420), GeoPoint::new(12.9731, 77.6399)],
        FlightParams {
            seed: Some(5),
            ..FlightParams::default()
        },
    )
    .unwrap()
}

fn spec(payload: serde_json::Value) -> InjectionSpec {
    InjectionSpec::from_payload(&payload, &InjectionConfig::default()).unwrap()
}

fn north_of(from: GeoPoint, meters: f64) -> GeoPoint {
    GeoPoint::new(from.lat + meters / METERS_PER_DEGREE, from.lon)
}

/// Level flight heading north at `speed` m/s.
fn northbound(time: f64, point: GeoPoint, speed: f64) -> TelemetrySample {
    TelemetrySample {
        time,
        gps_lat: Some(point.lat),
        gps_lon: Some(point.lon),
        alt: 40.0,
        vx: 0.0,
        vy: speed,
        speed,
        yaw: 0.0,
        roll: 0.0,
        pitch: 0.0,
        battery: 1.0,
        source: SampleSource::Normal,
        signature: None,
    }
}

fn frame(sample: TelemetrySample) -> String {
    UplinkMessage::telemetry(sample, None).encode().unwrap()
}

#[test]
fn test_geodesic_round_trip() {
    let target = GeoPoint::new(12.9731, 77.6399);
    let projected = geo::destination(HOME, geo::bearing(HOME, target), geo::distance(HOME, target));
    assert!(geo::distance(projected, target) < 0.01);
}

#[test]
fn test_sudden_jump_is_caught_locally() {
    let mut generator = generator();
    let mut engine = InjectionEngine::new(0.25);
    let heuristic = LocalFailsafeHeuristic::new(HeuristicConfig::default());
    let mut rng = StdRng::seed_from_u64(1);

    engine.start(spec(json!({ "mode": "jump", "mag": 50, "style": "sudden" })), T0);
    let before = generator.position();
    let raw = generator.step(0.25, None, T0);
    let out = engine.apply(raw.clone(), &mut generator, &mut rng, T0);

    assert!((geo::distance(raw.position().unwrap(), out.position().unwrap()) - 50.0).abs() < 1e-6);
    assert_eq!((out.vx, out.vy, out.speed), (0.0, 0.0, 0.0));
    assert_eq!(out.source, SampleSource::Injected);

    let trigger = heuristic.evaluate(engine.spec().unwrap(), before, &out).unwrap();
    assert!(matches!(trigger, LocalTrigger::Jump { .. }));
    assert!(trigger.to_string().starts_with("AUTO_FAILSAFE_JUMP_"));
}

#[test]
fn test_speed_attack_multiplies_and_triggers() {
    let mut generator = generator();
    let mut engine = InjectionEngine::new(0.25);
    let heuristic = LocalFailsafeHeuristic::new(HeuristicConfig::default());
    let mut rng = StdRng::seed_from_u64(1);

    engine.start(spec(json!({ "mode": "speed", "mag": 4 })), T0);
    let before = generator.position();
    let raw = generator.step(1.0, None, T0);
    assert!((raw.speed - 3.0).abs() < 1e-6);

    let out = engine.apply(raw, &mut generator, &mut rng, T0);
    assert!((out.speed - 12.0).abs() < 1e-6);

    let trigger = heuristic.evaluate(engine.spec().unwrap(), before, &out).unwrap();
    assert_eq!(trigger.to_string(), "AUTO_FAILSAFE_SPEED_x4");
}

#[test]
fn test_small_move_raises_nothing() {
    let detectors = DetectorSet::standard(&DetectionConfig::default());
    let mut history = TelemetryHistory::new(8);
    history.push(northbound(T0, HOME, 5.0));
    let current = northbound(T0 + 1.0, north_of(HOME, 5.0), 5.0);
    history.push(current.clone());

    let report = detectors.evaluate(&current, &history);
    assert!(report.is_clean());
    assert_eq!(decide(&report.alerts).action, FailsafeAction::None);
}

#[test]
fn test_gps_spoof_latches_hold_at_station() {
    let config = StationConfig {
        auto_latch: true,
        ..StationConfig::default()
    };
    let station = GroundStation::new(&config, &DetectionConfig::default());
    assert!(station.ingest(&frame(northbound(T0, HOME, 25.0))).is_some());

    let outcome = station
        .ingest(&frame(northbound(T0 + 1.0, north_of(HOME, 25.0), 25.0)))
        .unwrap();
    let ObserverMessage::Telemetry {
        alerts,
        decision,
        failsafe,
        ..
    } = outcome
    else {
        panic!("expected a telemetry envelope");
    };

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::GpsSpoof);
    assert_eq!(decision.action, FailsafeAction::Hold);
    assert!(failsafe.active);
    assert_eq!(failsafe.action, FailsafeAction::Hold);
    assert_eq!(station.history_len(), 2);
}

#[test]
fn test_expired_override_reverts_to_normal() {
    let mut config = Config::default();
    config.flight.seed = Some(2);
    let mut producer = DroneProducer::from_config(&config).unwrap();
    let target = north_of(HOME, 5.0);

    producer.on_attack_poll(
        true,
        Some(json!({ "mode": "route_override", "waypoints": [[target.lat, target.lon]], "dur": 1 })),
        T0,
    );

    let first = producer.tick(T0);
    assert!(first.escalation.is_none());
    assert!(producer.generator().has_override());

    let mut last = None;
    for i in 1..=5 {
        let output = producer.tick(T0 + 0.25 * f64::from(i));
        assert!(output.escalation.is_none());
        last = Some(output);
    }

    let UplinkMessage::Telemetry { payload, .. } = last.unwrap().message else {
        panic!("expected telemetry");
    };
    assert_eq!(payload.source, SampleSource::Normal);
    assert!(!producer.engine().is_active());
    assert!(!producer.generator().has_override());
}

#[test]
fn test_repeated_activation_keeps_first_reason() {
    let authority = FailsafeAuthority::new();
    authority.activate("GPS_SPOOF");
    authority.activate_with(FailsafeAction::Kill, "LATER");

    let state = authority.snapshot();
    assert_eq!(state.action, FailsafeAction::Hold);
    assert_eq!(state.reason.as_deref(), Some("GPS_SPOOF"));

    let kinds: Vec<_> = authority.history().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![FailsafeEventKind::Activated, FailsafeEventKind::Duplicate]);
}

#[test]
fn test_benign_lap_never_latches() {
    let mut config = Config::default();
    config.flight.seed = Some(7);
    let station = GroundStation::new(&config.station, &config.detection);
    let mut producer = DroneProducer::from_config(&config).unwrap();
    let interval = config.timing.telemetry_interval_s();

    let lap_m: f64 = {
        let points = config.flight.route_points();
        points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| geo::distance(*a, *b))
            .sum()
    };
    let ticks = (lap_m / config.flight.cruise_speed_mps / interval * 1.2) as usize;

    let mut advisories = 0;
    for i in 0..ticks {
        let output = producer.tick(T0 + interval * i as f64);
        assert!(output.escalation.is_none());
        let uplink = output.message.encode().unwrap();
        if let Some(ObserverMessage::Telemetry { decision, .. }) = station.handle_frame(&uplink) {
            if decision.action != FailsafeAction::None {
                advisories += 1;
            }
        }
        producer.on_failsafe_poll(&station.failsafe().snapshot());
    }

    // The sharp corners of the route raise YAW_JUMP on plain flight
    assert!(advisories > 0);
    assert!(!station.failsafe().is_active());
    assert!(station.failsafe().history().is_empty());
    assert!(!producer.is_frozen());
    assert_eq!(station.history_newest_first()[0].source, SampleSource::Normal);
}
