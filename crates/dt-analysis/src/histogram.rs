//! Weighted regular-binned 1-D histogram.

use serde::{Deserialize, Serialize};

/// A fixed-width binned accumulator over `[low, high)` with weighted
/// fills. Out-of-range values land in the under/overflow counters rather
/// than being dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    low: f64,
    high: f64,
    bins: Vec<f64>,
    underflow: f64,
    overflow: f64,
}

impl Histogram {
    /// Create a histogram with `n_bins` equal-width bins over `[low, high)`.
    pub fn new(n_bins: usize, low: f64, high: f64) -> Self {
        assert!(n_bins > 0 && high > low, "invalid histogram axis");
        Self { low, high, bins: vec![0.0; n_bins], underflow: 0.0, overflow: 0.0 }
    }

    /// Add `weight` to the bin containing `value`. Non-finite values are
    /// counted as overflow.
    pub fn fill(&mut self, value: f64, weight: f64) {
        if !value.is_finite() || value >= self.high {
            self.overflow += weight;
            return;
        }
        if value < self.low {
            self.underflow += weight;
            return;
        }
        let width = (self.high - self.low) / self.bins.len() as f64;
        let idx = ((value - self.low) / width) as usize;
        // Guard the upper edge against floating-point rounding.
        let idx = idx.min(self.bins.len() - 1);
        self.bins[idx] += weight;
    }

    /// Per-bin weighted counts.
    pub fn counts(&self) -> &[f64] {
        &self.bins
    }

    /// Sum of in-range weights.
    pub fn integral(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// Weight accumulated below the axis.
    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    /// Weight accumulated above the axis (including non-finite fills).
    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Axis bounds.
    pub fn bounds(&self) -> (f64, f64) {
        (self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn weighted_fills_land_in_bins() {
        let mut h = Histogram::new(10, 0.0, 200.0);
        h.fill(95.0, 2.0);
        h.fill(95.5, 1.0);
        h.fill(125.0, 0.5);
        assert_relative_eq!(h.counts()[4], 3.0);
        assert_relative_eq!(h.counts()[6], 0.5);
        assert_relative_eq!(h.integral(), 3.5);
    }

    #[test]
    fn out_of_range_and_nan() {
        let mut h = Histogram::new(4, 0.0, 4.0);
        h.fill(-1.0, 1.0);
        h.fill(4.0, 1.0);
        h.fill(f64::NAN, 1.0);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 2.0);
        assert_eq!(h.integral(), 0.0);
    }

    #[test]
    fn upper_edge_rounding_stays_in_last_bin() {
        let mut h = Histogram::new(3, 0.0, 0.3);
        h.fill(0.3 - 1e-16, 1.0);
        assert_eq!(h.counts()[2], 1.0);
    }
}
