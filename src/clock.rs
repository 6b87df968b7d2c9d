//! Timestamps as epoch seconds.

use chrono::Utc;
use tokio::time::Instant;

/// Current time in fractional seconds since the Unix epoch.
#[must_use]
pub fn now_s() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) * 1e-9
}

/// Epoch clock that advances with tokio's clock.
///
/// Anchored to the wall clock once, then driven by [`tokio::time::Instant`],
/// so sample times never step backwards and follow a paused test clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch_s: f64,
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn start() -> Self {
        Self::starting_at(now_s())
    }

    #[must_use]
    pub fn starting_at(epoch_s: f64) -> Self {
        Self {
            epoch_s,
            origin: Instant::now(),
        }
    }

    #[must_use]
    pub fn now_s(&self) -> f64 {
        self.epoch_s + self.origin.elapsed().as_secs_f64()
    }
}
