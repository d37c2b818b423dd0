//! Load samples and the bounded history they are kept in.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A load dimension tracked by the throttle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadDimension {
    ActiveParticipants,
    CallCount,
    Latency,
    Memory,
    ComputeCost,
}

impl LoadDimension {
    pub const ALL: [LoadDimension; 5] = [
        LoadDimension::ActiveParticipants,
        LoadDimension::CallCount,
        LoadDimension::Latency,
        LoadDimension::Memory,
        LoadDimension::ComputeCost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadDimension::ActiveParticipants => "active_participants",
            LoadDimension::CallCount => "call_count",
            LoadDimension::Latency => "latency",
            LoadDimension::Memory => "memory",
            LoadDimension::ComputeCost => "compute_cost",
        }
    }
}

impl fmt::Display for LoadDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observation of system load.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadSample {
    pub active_participants: f64,
    pub call_count: f64,
    /// Latency in milliseconds
    pub latency_ms: f64,
    /// Memory in megabytes
    pub memory_mb: f64,
    pub compute_cost: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl LoadSample {
    pub fn value(&self, dimension: LoadDimension) -> f64 {
        match dimension {
            LoadDimension::ActiveParticipants => self.active_participants,
            LoadDimension::CallCount => self.call_count,
            LoadDimension::Latency => self.latency_ms,
            LoadDimension::Memory => self.memory_mb,
            LoadDimension::ComputeCost => self.compute_cost,
        }
    }
}

/// Per-dimension ceilings. Load at or below the ceiling is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadCeilings {
    pub active_participants: f64,
    pub call_count: f64,
    pub latency_ms: f64,
    pub memory_mb: f64,
    pub compute_cost: f64,
}

impl Default for LoadCeilings {
    fn default() -> Self {
        Self {
            active_participants: 32.0,
            call_count: 64.0,
            latency_ms: 30_000.0,
            memory_mb: 4_096.0,
            compute_cost: 100.0,
        }
    }
}

impl LoadCeilings {
    pub fn ceiling(&self, dimension: LoadDimension) -> f64 {
        match dimension {
            LoadDimension::ActiveParticipants => self.active_participants,
            LoadDimension::CallCount => self.call_count,
            LoadDimension::Latency => self.latency_ms,
            LoadDimension::Memory => self.memory_mb,
            LoadDimension::ComputeCost => self.compute_cost,
        }
    }

    /// Fraction of the ceiling used by `value`. Non-positive ceilings
    /// disable the dimension (utilization 0).
    pub fn utilization(&self, dimension: LoadDimension, value: f64) -> f64 {
        let ceiling = self.ceiling(dimension);
        if ceiling <= 0.0 || value.is_nan() {
            0.0
        } else {
            value / ceiling
        }
    }

    /// Dimensions whose value in `sample` is above the ceiling.
    pub fn exceeded(&self, sample: &LoadSample) -> Vec<LoadDimension> {
        LoadDimension::ALL
            .into_iter()
            .filter(|d| self.utilization(*d, sample.value(*d)) > 1.0)
            .collect()
    }
}

/// Ring buffer of the most recent load samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadHistory {
    capacity: usize,
    samples: VecDeque<LoadSample>,
}

impl LoadHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: LoadSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&LoadSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadSample> {
        self.samples.iter()
    }

    /// Average of the last `window` samples, `None` when empty.
    pub fn window_average(&self, window: usize) -> Option<LoadSample> {
        let take = window.max(1).min(self.samples.len());
        if take == 0 {
            return None;
        }
        let n = take as f64;
        let mut avg = LoadSample::default();
        for sample in self.samples.iter().rev().take(take) {
            avg.active_participants += sample.active_participants / n;
            avg.call_count += sample.call_count / n;
            avg.latency_ms += sample.latency_ms / n;
            avg.memory_mb += sample.memory_mb / n;
            avg.compute_cost += sample.compute_cost / n;
        }
        avg.timestamp = self.samples.back().map(|s| s.timestamp).unwrap_or_default();
        Some(avg)
    }

    /// Replace the contents with previously persisted samples (oldest first).
    pub fn restore(&mut self, samples: impl IntoIterator<Item = LoadSample>) {
        self.samples.clear();
        for sample in samples {
            self.push(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latency(ms: f64) -> LoadSample {
        LoadSample {
            latency_ms: ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut history = LoadHistory::new(3);
        for ms in [1.0, 2.0, 3.0, 4.0] {
            history.push(latency(ms));
        }
        assert_eq!(history.len(), 3);
        let values: Vec<f64> = history.iter().map(|s| s.latency_ms).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_window_average_uses_trailing_samples() {
        let mut history = LoadHistory::new(10);
        for ms in [100.0, 10.0, 20.0] {
            history.push(latency(ms));
        }
        let avg = history.window_average(2).unwrap();
        assert!((avg.latency_ms - 15.0).abs() < 1e-9);
        assert!(LoadHistory::new(4).window_average(2).is_none());
    }

    #[test]
    fn test_exceeded_dimensions() {
        let ceilings = LoadCeilings {
            latency_ms: 1_000.0,
            ..Default::default()
        };
        let sample = LoadSample {
            latency_ms: 1_200.0,
            call_count: 1.0,
            ..Default::default()
        };
        assert_eq!(ceilings.exceeded(&sample), vec![LoadDimension::Latency]);
        assert!(ceilings.exceeded(&latency(1_000.0)).is_empty());
    }

    #[test]
    fn test_zero_ceiling_disables_dimension() {
        let ceilings = LoadCeilings {
            memory_mb: 0.0,
            ..Default::default()
        };
        assert_eq!(ceilings.utilization(LoadDimension::Memory, 10_000.0), 0.0);
    }
}
