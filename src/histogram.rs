//! Percentile providers
//!
//! The scorer asks a `PercentileProvider` where a duration falls within the
//! history of its scope. `RequestHistograms` is an in-process provider backed
//! by one bounded streaming histogram per scope. Bins are merged pairwise once
//! the bin limit is hit, so memory per scope stays fixed while quantiles
//! become approximate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::trace;

/// Default number of centroid bins per histogram
pub const DEFAULT_MAX_BINS: usize = 20;

/// Source of percentile estimates, keyed by scope name
pub trait PercentileProvider: Send + Sync {
    /// Approximate rank of `value` within the history of `key`, roughly in [0, 1]
    fn approximate_percentile_of(&self, key: &str, value: f64) -> f64;
}

impl<F> PercentileProvider for F
where
    F: Fn(&str, f64) -> f64 + Send + Sync,
{
    fn approximate_percentile_of(&self, key: &str, value: f64) -> f64 {
        self(key, value)
    }
}

/// One centroid: mean value and number of samples merged into it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub value: f64,
    pub count: u64,
}

/// Bounded streaming histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximateHistogram {
    max_bins: usize,
    bins: Vec<Bin>,
    total: u64,
    min: f64,
    max: f64,
}

impl ApproximateHistogram {
    pub fn new(max_bins: usize) -> Self {
        Self {
            max_bins: max_bins.max(1),
            bins: Vec::new(),
            total: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Add one sample. Non-finite samples are ignored.
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            trace!("Ignoring non-finite histogram sample {}", value);
            return;
        }

        self.total += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let idx = self.bins.partition_point(|b| b.value < value);
        match self.bins.get_mut(idx) {
            Some(bin) if bin.value == value => bin.count += 1,
            _ => self.bins.insert(idx, Bin { value, count: 1 }),
        }

        if self.bins.len() > self.max_bins {
            self.merge_closest();
        }
    }

    fn merge_closest(&mut self) {
        let Some(i) = (0..self.bins.len() - 1).min_by(|&a, &b| {
            let gap_a = self.bins[a + 1].value - self.bins[a].value;
            let gap_b = self.bins[b + 1].value - self.bins[b].value;
            gap_a.total_cmp(&gap_b)
        }) else {
            return;
        };

        let right = self.bins.remove(i + 1);
        let left = &mut self.bins[i];
        let count = left.count + right.count;
        left.value =
            (left.value * left.count as f64 + right.value * right.count as f64) / count as f64;
        left.count = count;
    }

    /// Approximate fraction of samples at or below `value`
    ///
    /// 0.0 for an empty histogram or values below the smallest sample, 1.0 at
    /// or above the largest. Interpolates between bins in between.
    pub fn approximate_quantile_of(&self, value: f64) -> f64 {
        if self.total == 0 || value.is_nan() || value < self.min {
            return 0.0;
        }
        if value >= self.max {
            return 1.0;
        }

        let total = self.total as f64;
        let first = self.bins[0];
        let last = self.bins[self.bins.len() - 1];

        if value < first.value {
            let t = (value - self.min) / (first.value - self.min);
            return (first.count as f64 / 2.0 * t) / total;
        }
        if value >= last.value {
            let t = (value - last.value) / (self.max - last.value);
            let below = total - last.count as f64 / 2.0;
            return (below + last.count as f64 / 2.0 * t) / total;
        }

        // bins[i].value <= value < bins[i + 1].value
        let i = self.bins.partition_point(|b| b.value <= value) - 1;
        let (left, right) = (self.bins[i], self.bins[i + 1]);
        let t = (value - left.value) / (right.value - left.value);
        let (m_l, m_r) = (left.count as f64, right.count as f64);

        let before: u64 = self.bins[..i].iter().map(|b| b.count).sum();
        let within = m_l * t + (m_r - m_l) * t * t / 2.0;
        ((before as f64 + m_l / 2.0 + within) / total).clamp(0.0, 1.0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn min(&self) -> Option<f64> {
        (self.total > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.total > 0).then_some(self.max)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let sum: f64 = self.bins.iter().map(|b| b.value * b.count as f64).sum();
        Some(sum / self.total as f64)
    }
}

impl Default for ApproximateHistogram {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BINS)
    }
}

/// Per-scope duration histograms
pub struct RequestHistograms {
    max_bins: usize,
    histograms: RwLock<HashMap<String, ApproximateHistogram>>,
}

impl RequestHistograms {
    pub fn new(max_bins: usize) -> Self {
        Self {
            max_bins,
            histograms: RwLock::new(HashMap::new()),
        }
    }

    /// Record a duration (seconds) for `key`
    pub fn add(&self, key: &str, value: f64) {
        let mut histograms = self.histograms.write().unwrap_or_else(|e| e.into_inner());
        histograms
            .entry(key.to_string())
            .or_insert_with(|| ApproximateHistogram::new(self.max_bins))
            .add(value);
    }

    /// Copy of the histogram for `key`
    pub fn get(&self, key: &str) -> Option<ApproximateHistogram> {
        let histograms = self.histograms.read().unwrap_or_else(|e| e.into_inner());
        histograms.get(key).cloned()
    }

    /// Number of scopes with a histogram
    pub fn len(&self) -> usize {
        self.histograms
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded history
    pub fn reset_all(&self) {
        self.histograms
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for RequestHistograms {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BINS)
    }
}

impl PercentileProvider for RequestHistograms {
    fn approximate_percentile_of(&self, key: &str, value: f64) -> f64 {
        let histograms = self.histograms.read().unwrap_or_else(|e| e.into_inner());
        histograms
            .get(key)
            .map(|h| h.approximate_quantile_of(value))
            .unwrap_or(0.0)
    }
}
