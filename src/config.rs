//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional: a missing section, or a missing key inside a
//! section, falls back to the default listed in the `default_*` functions.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{DroneGuardError, Result};
use crate::geo::GeoPoint;
use crate::injection::spec::{InjectionMode, InjectionStyle};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub flight: FlightConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub injection: InjectionConfig,
    #[serde(default)]
    pub heuristic: HeuristicConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Simulated flight configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FlightConfig {
    #[serde(default = "default_drone_id")]
    pub drone_id: String,

    #[serde(default = "default_cruise_speed_mps")]
    pub cruise_speed_mps: f64,

    #[serde(default = "default_altitude_m")]
    pub altitude_m: f64,

    #[serde(default = "default_battery_drain_per_sec")]
    pub battery_drain_per_sec: f64,

    /// Base route as `[lat, lon]` pairs
    #[serde(default = "default_waypoints")]
    pub waypoints: Vec<[f64; 2]>,

    /// Seed for jitter and attack bearings (random when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Producer cadences and link timing
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,

    #[serde(default = "default_attack_poll_interval_ms")]
    pub attack_poll_interval_ms: u64,

    #[serde(default = "default_failsafe_poll_interval_ms")]
    pub failsafe_poll_interval_ms: u64,

    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    #[serde(default = "default_control_timeout_ms")]
    pub control_timeout_ms: u64,
}

/// Defaults used when an attack payload omits a field
#[derive(Debug, Deserialize, Clone)]
pub struct InjectionConfig {
    #[serde(default = "default_injection_mode")]
    pub default_mode: String,

    #[serde(default = "default_injection_magnitude")]
    pub default_magnitude: f64,

    #[serde(default = "default_injection_style")]
    pub default_style: String,

    #[serde(default = "default_injection_duration_s")]
    pub default_duration_s: f64,
}

/// Drone-side auto-failsafe thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct HeuristicConfig {
    #[serde(default = "default_jump_threshold_m")]
    pub jump_threshold_m: f64,

    #[serde(default = "default_speed_multiplier_threshold")]
    pub speed_multiplier_threshold: f64,

    #[serde(default = "default_heading_shift_threshold_deg")]
    pub heading_shift_threshold_deg: f64,

    #[serde(default = "default_hijack_distance_m")]
    pub hijack_distance_m: f64,

    #[serde(default = "default_drift_rate_threshold_mps")]
    pub drift_rate_threshold_mps: f64,
}

/// Station-side detector thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    #[serde(default = "default_gps_jump_threshold_m")]
    pub gps_jump_threshold_m: f64,

    #[serde(default = "default_attitude_limit_deg")]
    pub attitude_limit_deg: f64,

    #[serde(default = "default_yaw_jump_threshold_deg")]
    pub yaw_jump_threshold_deg: f64,

    #[serde(default = "default_heading_mismatch_threshold_deg")]
    pub heading_mismatch_threshold_deg: f64,

    #[serde(default = "default_heading_min_speed_mps")]
    pub heading_min_speed_mps: f64,

    #[serde(default = "default_max_plausible_speed_mps")]
    pub max_plausible_speed_mps: f64,
}

/// Ground station configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StationConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Latch the advisory decision into the failsafe state. Off by default:
    /// only an explicit activation latches.
    #[serde(default = "default_auto_latch")]
    pub auto_latch: bool,

    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,

    #[serde(default = "default_ingest_buffer")]
    pub ingest_buffer: usize,

    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// Reject telemetry that carries no signature
    #[serde(default)]
    pub require_signature: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files (stdout only when absent)
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

/// Scripted operator actions for the demo binary
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DemoConfig {
    /// Seconds after startup to launch `attack`
    #[serde(default)]
    pub attack_after_s: Option<u64>,

    /// Seconds after startup to clear attacks and release the failsafe
    #[serde(default)]
    pub clear_after_s: Option<u64>,

    /// Raw attack payload, e.g. `{ mode = "jump", mag = 50 }`
    #[serde(default)]
    pub attack: Option<serde_json::Value>,
}

// Default value functions
fn default_drone_id() -> String { "drone_pi".to_string() }
fn default_cruise_speed_mps() -> f64 { 3.0 }
fn default_altitude_m() -> f64 { 40.0 }
fn default_battery_drain_per_sec() -> f64 { 0.0005 }
fn default_waypoints() -> Vec<[f64; 2]> {
    vec![
        [12.9718915, 77.6411545],
        [12.9725, 77.6420],
        [12.9731, 77.6399],
        [12.9717, 77.6385],
        [12.9710, 77.6396],
    ]
}

fn default_telemetry_interval_ms() -> u64 { 250 }
fn default_attack_poll_interval_ms() -> u64 { 1000 }
fn default_failsafe_poll_interval_ms() -> u64 { 800 }
fn default_reconnect_backoff_ms() -> u64 { 2000 }
fn default_control_timeout_ms() -> u64 { 2000 }

fn default_injection_mode() -> String { "jump".to_string() }
fn default_injection_magnitude() -> f64 { 30.0 }
fn default_injection_style() -> String { "sudden".to_string() }
fn default_injection_duration_s() -> f64 { 8.0 }

fn default_jump_threshold_m() -> f64 { 20.0 }
fn default_speed_multiplier_threshold() -> f64 { 3.0 }
fn default_heading_shift_threshold_deg() -> f64 { 90.0 }
fn default_hijack_distance_m() -> f64 { 20.0 }
fn default_drift_rate_threshold_mps() -> f64 { 10.0 }

fn default_gps_jump_threshold_m() -> f64 { 20.0 }
fn default_attitude_limit_deg() -> f64 { 45.0 }
fn default_yaw_jump_threshold_deg() -> f64 { 60.0 }
fn default_heading_mismatch_threshold_deg() -> f64 { 40.0 }
fn default_heading_min_speed_mps() -> f64 { 0.5 }
fn default_max_plausible_speed_mps() -> f64 { 50.0 }

fn default_history_capacity() -> usize { 200 }
fn default_auto_latch() -> bool { false }
fn default_observer_buffer() -> usize { 64 }
fn default_ingest_buffer() -> usize { 256 }
fn default_event_log_capacity() -> usize { 100 }

fn default_log_level() -> String { "info".to_string() }
fn default_log_file_prefix() -> String { "drone-guard.log".to_string() }

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            drone_id: default_drone_id(),
            cruise_speed_mps: default_cruise_speed_mps(),
            altitude_m: default_altitude_m(),
            battery_drain_per_sec: default_battery_drain_per_sec(),
            waypoints: default_waypoints(),
            seed: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            telemetry_interval_ms: default_telemetry_interval_ms(),
            attack_poll_interval_ms: default_attack_poll_interval_ms(),
            failsafe_poll_interval_ms: default_failsafe_poll_interval_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            control_timeout_ms: default_control_timeout_ms(),
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            default_mode: default_injection_mode(),
            default_magnitude: default_injection_magnitude(),
            default_style: default_injection_style(),
            default_duration_s: default_injection_duration_s(),
        }
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            jump_threshold_m: default_jump_threshold_m(),
            speed_multiplier_threshold: default_speed_multiplier_threshold(),
            heading_shift_threshold_deg: default_heading_shift_threshold_deg(),
            hijack_distance_m: default_hijack_distance_m(),
            drift_rate_threshold_mps: default_drift_rate_threshold_mps(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            gps_jump_threshold_m: default_gps_jump_threshold_m(),
            attitude_limit_deg: default_attitude_limit_deg(),
            yaw_jump_threshold_deg: default_yaw_jump_threshold_deg(),
            heading_mismatch_threshold_deg: default_heading_mismatch_threshold_deg(),
            heading_min_speed_mps: default_heading_min_speed_mps(),
            max_plausible_speed_mps: default_max_plausible_speed_mps(),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            auto_latch: default_auto_latch(),
            observer_buffer: default_observer_buffer(),
            ingest_buffer: default_ingest_buffer(),
            event_log_capacity: default_event_log_capacity(),
            require_signature: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

impl FlightConfig {
    /// Base route waypoints as points
    #[must_use]
    pub fn route_points(&self) -> Vec<GeoPoint> {
        self.waypoints.iter().map(|&[lat, lon]| GeoPoint::new(lat, lon)).collect()
    }
}

impl TimingConfig {
    /// Telemetry interval in seconds
    #[must_use]
    pub fn telemetry_interval_s(&self) -> f64 {
        self.telemetry_interval_ms as f64 / 1000.0
    }
}

fn invalid(message: impl std::fmt::Display) -> DroneGuardError {
    DroneGuardError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drone_guard::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Flight
        if self.flight.drone_id.is_empty() {
            return Err(invalid("drone_id cannot be empty"));
        }

        if !(self.flight.cruise_speed_mps > 0.0 && self.flight.cruise_speed_mps <= 40.0) {
            return Err(invalid("cruise_speed_mps must be greater than 0 and at most 40"));
        }

        if !(0.0..=1.0).contains(&self.flight.battery_drain_per_sec) {
            return Err(invalid("battery_drain_per_sec must be between 0.0 and 1.0"));
        }

        if !self.flight.altitude_m.is_finite() {
            return Err(invalid("altitude_m must be finite"));
        }

        if self.flight.waypoints.len() < 2 {
            return Err(invalid("flight route needs at least 2 waypoints"));
        }

        for point in self.flight.route_points() {
            if !point.is_valid() {
                return Err(invalid(format!(
                    "waypoint ({}, {}) is out of range",
                    point.lat, point.lon
                )));
            }
        }

        // Timing
        for (name, value) in [
            ("telemetry_interval_ms", self.timing.telemetry_interval_ms),
            ("attack_poll_interval_ms", self.timing.attack_poll_interval_ms),
            ("failsafe_poll_interval_ms", self.timing.failsafe_poll_interval_ms),
            ("reconnect_backoff_ms", self.timing.reconnect_backoff_ms),
            ("control_timeout_ms", self.timing.control_timeout_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        // Injection defaults
        if let InjectionMode::Unrecognized(name) = InjectionMode::parse(&self.injection.default_mode) {
            return Err(invalid(format!("unknown default injection mode '{}'", name)));
        }

        if InjectionStyle::parse(&self.injection.default_style).is_none() {
            return Err(invalid("default_style must be 'sudden' or 'smooth'"));
        }

        if !self.injection.default_magnitude.is_finite() {
            return Err(invalid("default_magnitude must be finite"));
        }

        if !(self.injection.default_duration_s > 0.0 && self.injection.default_duration_s <= 3600.0) {
            return Err(invalid("default_duration_s must be greater than 0 and at most 3600"));
        }

        // Thresholds
        for (name, value) in [
            ("jump_threshold_m", self.heuristic.jump_threshold_m),
            ("speed_multiplier_threshold", self.heuristic.speed_multiplier_threshold),
            ("heading_shift_threshold_deg", self.heuristic.heading_shift_threshold_deg),
            ("hijack_distance_m", self.heuristic.hijack_distance_m),
            ("drift_rate_threshold_mps", self.heuristic.drift_rate_threshold_mps),
            ("gps_jump_threshold_m", self.detection.gps_jump_threshold_m),
            ("attitude_limit_deg", self.detection.attitude_limit_deg),
            ("yaw_jump_threshold_deg", self.detection.yaw_jump_threshold_deg),
            ("heading_mismatch_threshold_deg", self.detection.heading_mismatch_threshold_deg),
            ("max_plausible_speed_mps", self.detection.max_plausible_speed_mps),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(format!("{} must be a positive number", name)));
            }
        }

        if self.detection.heading_min_speed_mps < 0.0 {
            return Err(invalid("heading_min_speed_mps cannot be negative"));
        }

        for (name, value) in [
            ("attitude_limit_deg", self.detection.attitude_limit_deg),
            ("yaw_jump_threshold_deg", self.detection.yaw_jump_threshold_deg),
            ("heading_mismatch_threshold_deg", self.detection.heading_mismatch_threshold_deg),
        ] {
            if value > 180.0 {
                return Err(invalid(format!("{} must be at most 180", name)));
            }
        }

        // Station
        if self.station.history_capacity < 2 {
            return Err(invalid("history_capacity must be at least 2"));
        }

        if self.station.observer_buffer == 0 {
            return Err(invalid("observer_buffer must be greater than 0"));
        }

        if self.station.ingest_buffer == 0 {
            return Err(invalid("ingest_buffer must be greater than 0"));
        }

        if self.station.event_log_capacity == 0 {
            return Err(invalid("event_log_capacity must be greater than 0"));
        }

        // Logging
        if self.logging.level.is_empty() {
            return Err(invalid("log level cannot be empty"));
        }

        if self.logging.file_prefix.is_empty() {
            return Err(invalid("log file_prefix cannot be empty"));
        }

        // Demo
        if let Some(attack) = &self.demo.attack {
            if !attack.is_object() {
                return Err(invalid("demo attack must be a table"));
            }
        }

        Ok(())
    }
}
