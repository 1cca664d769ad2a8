#![warn(missing_docs)]
//! # FluxProbe
//!
//! Micro-benchmarking helpers for hot paths and CI performance checks.
//!
//! - **Timing**: run a closure N times after optional untimed warmup and get
//!   total, min, max, mean, median and population standard deviation
//! - **Heap deltas**: snapshot allocator counters around a workload and get a
//!   signed field-wise difference
//! - **Reclamation reports**: record deallocation activity around a workload
//!   after a short settle delay
//! - **Allocation tracking**: `TrackingAllocator` feeds the heap counters
//!
//! ## Quick Start
//!
//! ```ignore
//! use fluxprobe::prelude::*;
//!
//! #[global_allocator]
//! static GLOBAL: TrackingAllocator = TrackingAllocator;
//!
//! let run = fluxprobe::perf(|n: u64| (0..n).sum::<u64>(), &PerfOptions::default().with_iterations(100), 1_000);
//! println!("avg {:.3} ms, stddev {:.3} ms", run.stats.avg, run.stats.stddev);
//!
//! let heap = fluxprobe::heap_stats(|_| vec![0u8; 1 << 20], &MemOptions::default(), ());
//! println!("malloced {} bytes", heap.delta.malloced_memory);
//! ```
//!
//! ## Async Workloads
//!
//! ```ignore
//! let run = fluxprobe::perf_async(
//!     |_| tokio::time::sleep(Duration::from_millis(1)),
//!     &PerfOptions::default().with_iterations(10),
//!     (),
//! )
//! .await;
//! ```

use std::future::Future;

// Re-export core types
pub use fluxprobe_core::{
    ActivityRecorder, AllocatorStats, Clock, DEFAULT_GC_TIMEOUT, DEFAULT_ITERATIONS,
    DEFAULT_WARMUP, GC_REPORT_VERSION, GcEvent, GcProfilerOptions, GcReport, HeapDelta,
    HeapSnapshot, HeapStatsProvider, HeapStatsResult, MemOptions, MonotonicClock, PerfOptions,
    PerfResult, Probe, ReclaimRecorder, ReclaimRecorderFactory, RecorderFactory, Timer,
    TrackingAllocator, TrackingHeap, allocator_stats, current_allocation, pin_to_cpu,
    reset_allocation_counter,
};

// Re-export stats
pub use fluxprobe_stats::{PerfStats, compute_stats, median, population_std_dev};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        GcProfilerOptions, MemOptions, PerfOptions, PerfResult, PerfStats, Probe,
        TrackingAllocator,
    };
}

/// Time `f` with a default [`Probe`]
pub fn perf<A, T, F>(f: F, options: &PerfOptions, args: A) -> PerfResult<T>
where
    A: Clone,
    F: FnMut(A) -> T,
{
    Probe::new().perf(f, options, args)
}

/// Time async `f` with a default [`Probe`]
pub async fn perf_async<A, T, F, Fut>(f: F, options: &PerfOptions, args: A) -> PerfResult<T>
where
    A: Clone,
    F: FnMut(A) -> Fut,
    Fut: Future<Output = T>,
{
    Probe::new().perf_async(f, options, args).await
}

/// Heap delta around `f` with a default [`Probe`]
pub fn heap_stats<A, T, F>(f: F, options: &MemOptions, args: A) -> HeapStatsResult
where
    A: Clone,
    F: FnMut(A) -> T,
{
    Probe::new().heap_stats(f, options, args)
}

/// Heap delta around async `f` with a default [`Probe`]
pub async fn heap_stats_async<A, T, F, Fut>(f: F, options: &MemOptions, args: A) -> HeapStatsResult
where
    A: Clone,
    F: FnMut(A) -> Fut,
    Fut: Future<Output = T>,
{
    Probe::new().heap_stats_async(f, options, args).await
}

/// Reclamation report around `f` with a default [`Probe`]
pub async fn gc_profile<A, T, F>(f: F, options: &GcProfilerOptions, args: A) -> GcReport
where
    A: Clone,
    F: FnMut(A) -> T,
{
    Probe::new().gc_profile(f, options, args).await
}

/// Reclamation report around async `f` with a default [`Probe`]
pub async fn gc_profile_async<A, T, F, Fut>(f: F, options: &GcProfilerOptions, args: A) -> GcReport
where
    A: Clone,
    F: FnMut(A) -> Fut,
    Fut: Future<Output = T>,
{
    Probe::new().gc_profile_async(f, options, args).await
}

/// Run the FluxProbe CLI.
///
/// ```ignore
/// fn main() {
///     fluxprobe::run().unwrap();
/// }
/// ```
pub use fluxprobe_cli::run;
