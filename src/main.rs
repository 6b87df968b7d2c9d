//! # Drone Guard
//!
//! Runs the whole telemetry loop in one process: a simulated drone streams
//! telemetry to an in-process ground station, which detects anomalies and
//! drives the failsafe.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (`DRONE_GUARD_CONFIG`, else `config/default.toml`, else defaults)
//!    - Set up logging
//!    - Start the station's ingest task and an observer that logs what it sees
//!
//! 2. **Main Loop**
//!    - The drone connects over the in-process link and streams telemetry
//!    - An optional scripted attack from `[demo]` is launched and later cleared
//!    - Handle Ctrl+C for graceful shutdown
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=drone_guard=debug cargo run --release
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use drone_guard::config::{Config, DemoConfig};
use drone_guard::drone::{self, DroneProducer};
use drone_guard::link::channel;
use drone_guard::link::ControlPlane;
use drone_guard::logging;
use drone_guard::station::{GroundStation, LocalControl, Observer};

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "DRONE_GUARD_CONFIG";

/// Configuration file used when the environment variable is unset
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

fn load_config() -> Result<Config> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Config::load(&path).with_context(|| format!("Failed to load configuration from {}", path));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH));
    }

    Ok(Config::default())
}

/// Logs observer envelopes: alerts and failsafe changes at `warn`/`info`, the rest at `debug`.
async fn log_observer(mut observer: Observer) {
    while let Some(frame) = observer.recv().await {
        let Ok(message) = serde_json::from_str::<Value>(&frame) else {
            continue;
        };
        match message["type"].as_str() {
            Some("telemetry") => {
                let alerts = message["alerts"].as_array().map_or(0, Vec::len);
                if alerts > 0 {
                    warn!(
                        "Observer: {} alert(s), decision {}, failsafe active={}",
                        alerts, message["decision"]["action"], message["failsafe"]["active"]
                    );
                } else {
                    debug!("Observer: {}", message["payload"]);
                }
            }
            Some("signature_fail") => warn!("Observer: signature check failed"),
            Some("diagnostic") => info!("Observer: diagnostic {}", message["event"]),
            Some("failsafe") => info!("Observer: failsafe {}", message["failsafe"]),
            _ => debug!("Observer: {}", frame),
        }
    }
}

/// Plays the `[demo]` operator script against the station.
async fn run_demo(station: Arc<GroundStation>, demo: DemoConfig) {
    let mut elapsed = 0;

    if let (Some(at), Some(attack)) = (demo.attack_after_s, demo.attack.clone()) {
        sleep(Duration::from_secs(at)).await;
        elapsed = at;
        match station.launch_attack(attack) {
            Ok(stored) => info!("Demo attack launched: {}", stored),
            Err(e) => warn!("Demo attack rejected: {}", e),
        }
    }

    if let Some(at) = demo.clear_after_s {
        sleep(Duration::from_secs(at.saturating_sub(elapsed))).await;
        station.clear_attacks();
        station.deactivate_failsafe();
        info!("Demo attack cleared and failsafe released");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = logging::init(&config.logging);

    info!("Drone Guard v{} starting...", env!("CARGO_PKG_VERSION"));

    // Ground station
    let station = Arc::new(GroundStation::new(&config.station, &config.detection));
    let (connector, uplink) = channel::channel(config.station.ingest_buffer, "in-process station");
    tokio::spawn(Arc::clone(&station).serve(uplink));
    tokio::spawn(log_observer(station.subscribe()));
    tokio::spawn(run_demo(Arc::clone(&station), config.demo.clone()));

    // Drone
    let control: Arc<dyn ControlPlane> = Arc::new(LocalControl::new(Arc::clone(&station)));
    let mut producer = DroneProducer::from_config(&config)?;
    info!(
        "Drone '{}' flying {} waypoints at {} m/s",
        producer.drone_id(),
        config.flight.waypoints.len(),
        config.flight.cruise_speed_mps
    );
    info!("Press Ctrl+C to exit");

    tokio::select! {
        _ = drone::run(&mut producer, &connector, control, &config.timing) => {}

        // Handle Ctrl+C for graceful shutdown
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    let stats = station.stats();
    info!(
        "Station processed {} frames ({} dropped, {} signature failures)",
        stats.frames, stats.dropped, stats.signature_failures
    );
    if station.failsafe().is_active() {
        info!("Failsafe still active: {:?}", station.failsafe().snapshot());
    }

    Ok(())
}
