//! # Telemetry History
//!
//! Fixed-capacity FIFO of recent samples, oldest to newest.
//!
//! Lookback offsets count back from the newest entry: offset 0 is the most
//! recent sample, offset 1 the one before it, and so on. The station pushes a
//! sample before running detectors, so detectors find the previous sample at
//! offset 1.
//!
//! ```
//! use drone_guard::telemetry::TelemetryHistory;
//! # use drone_guard::telemetry::TelemetrySample;
//! # fn at(time: f64) -> TelemetrySample {
//! #     serde_json::from_value(serde_json::json!({ "time": time })).unwrap()
//! # }
//!
//! let mut history = TelemetryHistory::new(2);
//! history.push(at(1.0));
//! history.push(at(2.0));
//! history.push(at(3.0)); // evicts 1.0
//!
//! assert_eq!(history.lookback(0).map(|s| s.time), Some(3.0));
//! assert_eq!(history.previous().map(|s| s.time), Some(2.0));
//! assert_eq!(history.lookback(2), None);
//! ```

use std::collections::VecDeque;

use super::sample::TelemetrySample;

/// Bounded insertion-ordered buffer of telemetry samples.
#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    samples: VecDeque<TelemetrySample>,
    capacity: usize,
}

impl TelemetryHistory {
    /// Creates an empty history. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest one when full.
    pub fn push(&mut self, sample: TelemetrySample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.samples.back()
    }

    /// Sample `offset` positions back from the newest (0 = newest).
    #[must_use]
    pub fn lookback(&self, offset: usize) -> Option<&TelemetrySample> {
        let len = self.samples.len();
        if offset >= len {
            return None;
        }
        self.samples.get(len - 1 - offset)
    }

    /// The sample before the newest one.
    #[must_use]
    pub fn previous(&self) -> Option<&TelemetrySample> {
        self.lookback(1)
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TelemetrySample> + '_ {
        self.samples.iter()
    }

    /// Copy of the buffer, oldest to newest.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TelemetrySample> {
        self.samples.iter().cloned().collect()
    }

    /// Copy of the buffer, newest first. Presentation only.
    #[must_use]
    pub fn newest_first(&self) -> Vec<TelemetrySample> {
        self.samples.iter().rev().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sample::SampleSource;

    fn at(time: f64) -> TelemetrySample {
        TelemetrySample {
            time,
            gps_lat: Some(0.0),
            gps_lon: Some(0.0),
            alt: 40.0,
            vx: 0.0,
            vy: 0.0,
            speed: 0.0,
            yaw: 0.0,
            roll: 0.0,
            pitch: 0.0,
            battery: 1.0,
            source: SampleSource::Normal,
            signature: None,
        }
    }

    fn times(samples: &[TelemetrySample]) -> Vec<f64> {
        samples.iter().map(|s| s.time).collect()
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = TelemetryHistory::new(5);
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert_eq!(history.capacity(), 5);
        assert!(history.latest().is_none());
        assert!(history.previous().is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut history = TelemetryHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.push(at(1.0));
        history.push(at(2.0));
        assert_eq!(times(&history.snapshot()), vec![2.0]);
    }

    #[test]
    fn test_eviction_keeps_insertion_order() {
        let mut history = TelemetryHistory::new(3);
        for t in 1..=5 {
            history.push(at(t as f64));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(times(&history.snapshot()), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_lookback_offsets() {
        let mut history = TelemetryHistory::new(10);
        for t in 1..=4 {
            history.push(at(t as f64));
        }
        assert_eq!(history.lookback(0).unwrap().time, 4.0);
        assert_eq!(history.lookback(1).unwrap().time, 3.0);
        assert_eq!(history.lookback(2).unwrap().time, 2.0);
        assert_eq!(history.lookback(3).unwrap().time, 1.0);
        assert!(history.lookback(4).is_none());
        assert_eq!(history.latest().unwrap().time, 4.0);
        assert_eq!(history.previous().unwrap().time, 3.0);
    }

    #[test]
    fn test_lookback_after_wraparound() {
        let mut history = TelemetryHistory::new(2);
        for t in 1..=7 {
            history.push(at(t as f64));
        }
        assert_eq!(history.lookback(0).unwrap().time, 7.0);
        assert_eq!(history.lookback(1).unwrap().time, 6.0);
        assert!(history.lookback(2).is_none());
    }

    #[test]
    fn test_newest_first_does_not_change_snapshot() {
        let mut history = TelemetryHistory::new(4);
        for t in 1..=3 {
            history.push(at(t as f64));
        }
        assert_eq!(times(&history.newest_first()), vec![3.0, 2.0, 1.0]);
        assert_eq!(times(&history.snapshot()), vec![1.0, 2.0, 3.0]);
        assert_eq!(history.previous().unwrap().time, 2.0);
    }

    #[test]
    fn test_clear() {
        let mut history = TelemetryHistory::new(4);
        history.push(at(1.0));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 4);
    }
}
