use std::sync::{Mutex, PoisonError};

use rand::Rng;

use crate::instrument::Snapshot;

/// Default number of samples kept by a histogram's reservoir.
pub const RESERVOIR_SIZE: usize = 1028;

/// Distribution of `i64` observations backed by a uniform reservoir sample.
#[derive(Debug)]
pub struct Histogram {
    reservoir: Mutex<Reservoir>,
}
impl Histogram {
    pub fn new() -> Self {
        Self::with_reservoir(RESERVOIR_SIZE)
    }
    pub fn with_reservoir(size: usize) -> Self {
        Self {
            reservoir: Mutex::new(Reservoir::new(size)),
        }
    }

    pub fn update(&self, value: i64) {
        self.reservoir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(value);
    }
    pub fn clear(&self) {
        let mut reservoir = self.reservoir.lock().unwrap_or_else(PoisonError::into_inner);
        reservoir.count = 0;
        reservoir.values.clear();
    }
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.reservoir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }
}
impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
impl Snapshot<HistogramSnapshot> for Histogram {
    fn snapshot(&self) -> HistogramSnapshot {
        Histogram::snapshot(self)
    }
}

/// Vitter's algorithm R. Callers provide the locking.
#[derive(Debug)]
pub(crate) struct Reservoir {
    count: i64,
    size: usize,
    values: Vec<i64>,
}
impl Reservoir {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            count: 0,
            size,
            values: Vec::with_capacity(size),
        }
    }

    pub(crate) fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot::new(self.count, self.values.clone())
    }
    pub(crate) fn update(&mut self, value: i64) {
        self.count += 1;
        if self.values.len() < self.size {
            self.values.push(value);
            return;
        }
        let slot = rand::rng().random_range(0..self.count);
        if let Ok(slot) = usize::try_from(slot) {
            if slot < self.size {
                self.values[slot] = value;
            }
        }
    }
}

/// Frozen copy of a histogram. All statistics derive from the same sorted
/// sample set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSnapshot {
    count: i64,
    values: Vec<i64>,
}
impl HistogramSnapshot {
    /// `count` is the total number of observations, which may exceed the
    /// number of retained `values`.
    pub fn new(count: i64, mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { count, values }
    }
    pub fn from_values(values: Vec<i64>) -> Self {
        let count = i64::try_from(values.len()).unwrap_or(i64::MAX);
        Self::new(count, values)
    }

    pub fn count(&self) -> i64 {
        self.count
    }
    pub fn values(&self) -> &[i64] {
        &self.values
    }
    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }
    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.values.iter().map(|&v| v as f64).sum();
        sum / self.values.len() as f64
    }
    /// Population variance of the retained samples.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum: f64 = self
            .values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        sum / self.values.len() as f64
    }
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Linear interpolation between the samples around rank `p * (n + 1)`,
    /// clamped to the smallest and largest sample.
    pub fn percentile(&self, p: f64) -> f64 {
        let Some((&first, &last)) = self.values.first().zip(self.values.last()) else {
            return 0.0;
        };
        let size = self.values.len();
        let pos = p * (size + 1) as f64;
        if pos < 1.0 {
            return first as f64;
        }
        if pos >= size as f64 {
            return last as f64;
        }
        let index = pos as usize;
        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }
    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        ps.iter().map(|&p| self.percentile(p)).collect()
    }
}
