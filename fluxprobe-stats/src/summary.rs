//! Summary Statistics
//!
//! All moments are computed over the raw samples with no outlier rejection:
//! a micro-benchmark run is usually short, and every measured call counts.
//!
//! An empty sample set yields `total == 0.0` and `NaN` for every other moment.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Statistics over the measured durations of one harness call.
///
/// All durations are in milliseconds. `times` keeps the samples in execution
/// order; `iterations == times.len()` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfStats {
    /// Sum of all samples
    pub total: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Arithmetic mean
    pub avg: f64,
    /// Median of the ascending sort
    pub median: f64,
    /// Population standard deviation
    pub stddev: f64,
    /// Number of measured iterations
    pub iterations: usize,
    /// Number of unmeasured warmup iterations that preceded the measurement
    pub warmup_iterations: usize,
    /// Raw samples in execution order
    pub times: Vec<f64>,
}

/// Compute statistics over `times`, taking ownership of the sample buffer.
pub fn compute_stats(times: Vec<f64>, warmup_iterations: usize) -> PerfStats {
    if times.is_empty() {
        return PerfStats {
            total: 0.0,
            min: f64::NAN,
            max: f64::NAN,
            avg: f64::NAN,
            median: f64::NAN,
            stddev: f64::NAN,
            iterations: 0,
            warmup_iterations,
            times,
        };
    }

    let total: f64 = times.iter().sum();
    let min = times.iter().copied().fold(f64::INFINITY, f64::min);
    let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let median = median(&times);
    // Equal samples: summation error must not leak into the moments
    let (avg, stddev) = if min == max {
        (min, 0.0)
    } else {
        let avg = total / times.len() as f64;
        (avg, population_std_dev(&times, avg))
    };

    PerfStats {
        total,
        min,
        max,
        avg,
        median,
        stddev,
        iterations: times.len(),
        warmup_iterations,
        times,
    }
}

/// Median of `samples`: the middle element of the ascending sort, or the mean
/// of the two middle elements for an even count. `NaN` when empty.
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Square root of the mean squared deviation from `mean` (divisor `n`).
/// `NaN` when empty.
pub fn population_std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }

    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

impl PerfStats {
    /// Coefficient of variation in percent (relative stddev)
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.avg == 0.0 || self.avg.is_nan() {
            0.0
        } else {
            (self.stddev / self.avg) * 100.0
        }
    }

    /// Whether no measured samples were collected
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
