#![warn(missing_docs)]
//! FluxProbe Core - Measurement Harnesses
//!
//! This crate wraps a unit of work and measures what happens around it:
//! - Timing harness with untimed warmup (`Probe::perf`, `Probe::perf_async`)
//! - Heap snapshot harness with field-wise deltas (`Probe::heap_stats`)
//! - Reclamation report harness (`Probe::gc_profile`)
//! - Global allocator interceptor backing the default heap provider
//!
//! The clock, heap snapshot source and activity recorder are traits, so the
//! harnesses can be driven by deterministic stand-ins in tests.

mod allocator;
mod gc;
mod heap;
mod measure;
mod options;
mod probe;
mod timing;

pub use allocator::{
    AllocatorStats, TrackingAllocator, allocator_stats, current_allocation,
    reset_allocation_counter,
};
pub use gc::{
    ActivityRecorder, GC_REPORT_VERSION, GcEvent, GcReport, ReclaimRecorder,
    ReclaimRecorderFactory, RecorderFactory,
};
pub use heap::{HeapDelta, HeapSnapshot, HeapStatsProvider, HeapStatsResult, TrackingHeap};
pub use measure::{Clock, MonotonicClock, Timer, pin_to_cpu};
pub use options::{
    DEFAULT_GC_TIMEOUT, DEFAULT_ITERATIONS, DEFAULT_WARMUP, GcProfilerOptions, MemOptions,
    PerfOptions,
};
pub use probe::Probe;
pub use timing::PerfResult;

pub use fluxprobe_stats::PerfStats;
