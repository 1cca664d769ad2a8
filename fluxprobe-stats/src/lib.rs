#![warn(missing_docs)]
//! FluxProbe Statistics Engine
//!
//! Descriptive statistics over the duration samples collected by the timing
//! harness:
//! - Total, minimum and maximum
//! - Arithmetic mean and median
//! - Population standard deviation (divisor `n`)
//!
//! Only measured samples enter the computation; warmup durations never reach
//! this crate.

mod summary;

pub use summary::{PerfStats, compute_stats, median, population_std_dev};
