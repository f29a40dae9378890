use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of resource samples retained per device
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

/// One resource-usage sample taken from a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage_v: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ResourceUsage {
    pub fn new(cpu_percent: f64, memory_percent: f64, disk_percent: f64) -> Self {
        Self {
            cpu_percent,
            memory_percent,
            disk_percent,
            temperature_c: None,
            voltage_v: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_temperature(mut self, temperature_c: f64) -> Self {
        self.temperature_c = Some(temperature_c);
        self
    }

    pub fn with_voltage(mut self, voltage_v: f64) -> Self {
        self.voltage_v = Some(voltage_v);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// True when any of cpu/memory/disk is above its alert threshold
    pub fn exceeds(&self, thresholds: &ResourceThresholds) -> bool {
        self.cpu_percent > thresholds.cpu_percent
            || self.memory_percent > thresholds.memory_percent
            || self.disk_percent > thresholds.disk_percent
    }
}

/// Alert thresholds applied to resource samples
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceThresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 90.0,
            memory_percent: 90.0,
            disk_percent: 90.0,
        }
    }
}

/// Bounded ring of resource samples, oldest evicted first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceHistory {
    samples: VecDeque<ResourceUsage>,
    capacity: usize,
}

impl ResourceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: ResourceUsage) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&ResourceUsage> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceUsage> {
        self.samples.iter()
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
}

impl Default for ResourceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceeds_any_threshold() {
        let thresholds = ResourceThresholds::default();
        assert!(!ResourceUsage::new(50.0, 50.0, 50.0).exceeds(&thresholds));
        assert!(ResourceUsage::new(95.0, 50.0, 50.0).exceeds(&thresholds));
        assert!(ResourceUsage::new(50.0, 95.0, 50.0).exceeds(&thresholds));
        assert!(ResourceUsage::new(50.0, 50.0, 95.0).exceeds(&thresholds));
    }

    #[test]
    fn test_exact_threshold_is_not_exceeded() {
        let thresholds = ResourceThresholds::default();
        assert!(!ResourceUsage::new(90.0, 90.0, 90.0).exceeds(&thresholds));
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut history = ResourceHistory::new(300);
        for i in 0..350 {
            history.push(ResourceUsage::new(i as f64, 0.0, 0.0));
        }
        assert_eq!(history.len(), 300);
        // samples 0..50 were evicted, 50..350 remain in order
        assert_eq!(history.iter().next().unwrap().cpu_percent, 50.0);
        assert_eq!(history.latest().unwrap().cpu_percent, 349.0);
    }
}
