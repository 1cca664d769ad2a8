//! Integration tests for FluxProbe
//!
//! These run the public entry points with the tracking allocator installed,
//! so heap counters are live. Tests share the global counters and run in
//! parallel; heap assertions are lower bounds.

use fluxprobe::prelude::*;
use fluxprobe::{
    GC_REPORT_VERSION, HeapSnapshot, HeapStatsProvider, MonotonicClock, TrackingHeap,
    allocator_stats, compute_stats, current_allocation, reset_allocation_counter,
};
use std::cell::Cell;
use std::time::Duration;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

const MIB: usize = 1 << 20;

/// Timing runs the callable warmup + iterations times and records only the
/// measured ones
#[test]
fn test_perf_counts_warmup_separately() {
    let calls = Cell::new(0usize);
    let options = PerfOptions::default().with_iterations(5).with_warmup(3);

    let run = fluxprobe::perf(
        |n: u64| {
            calls.set(calls.get() + 1);
            (0..n).sum::<u64>()
        },
        &options,
        100,
    );

    assert_eq!(calls.get(), 8);
    assert_eq!(run.stats.iterations, 5);
    assert_eq!(run.stats.warmup_iterations, 3);
    assert_eq!(run.stats.times.len(), 5);
    assert_eq!(run.result, Some(4950));

    let stats = &run.stats;
    assert!(stats.min <= stats.median && stats.median <= stats.max);
    assert!(stats.min <= stats.avg && stats.avg <= stats.max);
    assert!((stats.total - stats.times.iter().sum::<f64>()).abs() < 1e-9);
}

/// Zero iterations still runs warmup but returns no value
#[test]
fn test_perf_zero_iterations() {
    let calls = Cell::new(0usize);
    let options = PerfOptions::default().with_iterations(0).with_warmup(2);

    let run = fluxprobe::perf(|_| calls.set(calls.get() + 1), &options, ());

    assert_eq!(calls.get(), 2);
    assert!(run.result.is_none());
    assert_eq!(run.stats.total, 0.0);
    assert!(run.stats.avg.is_nan());
}

/// Each invocation gets its own clone of the arguments
#[test]
fn test_perf_passes_cloned_arguments() {
    let options = PerfOptions::default().with_iterations(3);
    let run = fluxprobe::perf(
        |mut v: Vec<u32>| {
            v.push(4);
            v.len()
        },
        &options,
        vec![1, 2, 3],
    );
    assert_eq!(run.result, Some(4));
}

/// The statistics helpers agree with hand-computed values
#[test]
fn test_stats_fixture() {
    let stats = compute_stats(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 0);

    assert_eq!(stats.total, 40.0);
    assert_eq!(stats.min, 2.0);
    assert_eq!(stats.max, 9.0);
    assert_eq!(stats.avg, 5.0);
    assert_eq!(stats.median, 4.5);
    assert_eq!(stats.stddev, 2.0);
}

/// Errors from a fallible callable abort the timing run
#[test]
fn test_try_perf_propagates_error() {
    let calls = Cell::new(0usize);
    let options = PerfOptions::default().with_iterations(10);

    let result = Probe::new().try_perf(
        |_| {
            calls.set(calls.get() + 1);
            if calls.get() == 3 {
                Err("boom")
            } else {
                Ok(calls.get())
            }
        },
        &options,
        (),
    );

    assert_eq!(result.unwrap_err(), "boom");
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn test_perf_async_measures_awaited_time() {
    let options = PerfOptions::default().with_iterations(3).with_warmup(1);
    let run = fluxprobe::perf_async(
        |ms: u64| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        },
        &options,
        5,
    )
    .await;

    assert_eq!(run.result, Some(5));
    assert_eq!(run.stats.times.len(), 3);
    assert!(run.stats.min >= 4.0);
}

/// Allocation inside the workload shows up in the malloced delta
#[test]
fn test_heap_stats_sees_allocations() {
    assert!(allocator_stats().is_tracking());

    let options = MemOptions::default().with_iterations(4);
    let result = fluxprobe::heap_stats(|size: usize| vec![1u8; size], &options, MIB);

    assert!(result.delta.malloced_memory >= (4 * MIB) as i64);
    assert!(result.after.malloced_memory >= result.before.malloced_memory);
    assert_eq!(result.delta.external_memory, 0);
    assert_eq!(result.before.heap_size_limit, u64::MAX);
    assert_eq!(result.delta.heap_size_limit, 0);
}

#[test]
fn test_heap_stats_with_limit() {
    let limit = 1u64 << 40;
    let probe = Probe::new().with_heap(TrackingHeap::with_limit(limit));
    let result = probe.heap_stats(|_| (), &MemOptions::default(), ());

    assert_eq!(result.before.heap_size_limit, limit);
    assert_eq!(result.after.heap_size_limit, limit);
    assert!(result.after.total_available_size <= limit);
}

#[tokio::test]
async fn test_heap_stats_async() {
    let options = MemOptions::default().with_iterations(2);
    let result = fluxprobe::heap_stats_async(
        |size: usize| async move {
            tokio::task::yield_now().await;
            vec![0u8; size]
        },
        &options,
        MIB,
    )
    .await;

    assert!(result.delta.malloced_memory >= (2 * MIB) as i64);
}

/// Dropped buffers are reported as reclaimed bytes
#[tokio::test]
async fn test_gc_profile_reports_frees() {
    let options = GcProfilerOptions::default()
        .with_iterations(3)
        .with_timeout(Duration::from_millis(5));

    let report = fluxprobe::gc_profile(
        |size: usize| {
            let buf = vec![7u8; size];
            buf.len()
        },
        &options,
        MIB,
    )
    .await;

    assert_eq!(report.version, GC_REPORT_VERSION);
    assert!(report.end_time - report.start_time >= 5.0);
    assert_eq!(report.samples.len(), 1);

    let event = &report.samples[0];
    assert!(event.freed_bytes >= (3 * MIB) as u64);
    assert!(event.freed_count >= 3);
    assert!(event.allocated_bytes >= (3 * MIB) as u64);
    assert!(event.cost >= 5.0);
}

#[tokio::test]
async fn test_gc_profile_async_error_skips_report() {
    let options = GcProfilerOptions::default().with_iterations(5);
    let calls = Cell::new(0usize);

    let result = Probe::new()
        .try_gc_profile_async(
            |_| {
                calls.set(calls.get() + 1);
                let fail = calls.get() == 2;
                async move { if fail { Err("failed") } else { Ok(()) } }
            },
            &options,
            (),
        )
        .await;

    assert_eq!(result.unwrap_err(), "failed");
    assert_eq!(calls.get(), 2);
}

/// Errors in the synchronous gc harness are logged and skipped
#[tokio::test]
async fn test_try_gc_profile_discards_errors() {
    let options = GcProfilerOptions::default().with_iterations(4);
    let calls = Cell::new(0usize);

    let report = Probe::new()
        .try_gc_profile(
            |_| {
                calls.set(calls.get() + 1);
                Err::<(), _>("ignored")
            },
            &options,
            (),
        )
        .await;

    assert_eq!(calls.get(), 4);
    assert_eq!(report.version, GC_REPORT_VERSION);
}

/// A closure can stand in for the recorder factory
#[tokio::test]
async fn test_custom_recorder_factory() {
    struct Counting(usize);

    impl fluxprobe::ActivityRecorder for Counting {
        type Report = usize;

        fn start(&mut self) {
            self.0 += 1;
        }

        fn stop(&mut self) -> usize {
            self.0 + 10
        }
    }

    let probe = Probe::new().with_recorder(|| Counting(0));
    let report = probe
        .gc_profile(|_| (), &GcProfilerOptions::default(), ())
        .await;

    assert_eq!(report, 11);
}

/// Custom clocks and heap providers drive the harnesses deterministically
#[test]
fn test_custom_clock_and_heap() {
    struct Stepping(Cell<f64>);

    impl fluxprobe::Clock for Stepping {
        fn now(&self) -> f64 {
            let t = self.0.get();
            self.0.set(t + 2.5);
            t
        }
    }

    struct Growing(Cell<u64>);

    impl HeapStatsProvider for Growing {
        fn snapshot(&self) -> HeapSnapshot {
            let used = self.0.get();
            self.0.set(used + 100);
            HeapSnapshot {
                used_heap_size: used,
                ..HeapSnapshot::default()
            }
        }
    }

    let probe = Probe::new()
        .with_clock(Stepping(Cell::new(0.0)))
        .with_heap(Growing(Cell::new(1_000)));

    let run = probe.perf(|_| (), &PerfOptions::default().with_iterations(4), ());
    assert_eq!(run.stats.times, vec![2.5; 4]);
    assert_eq!(run.stats.stddev, 0.0);

    let heap = probe.heap_stats(|_| (), &MemOptions::default(), ());
    assert_eq!(heap.delta.used_heap_size, 100);
}

#[test]
fn test_tracking_heap_reads_allocator() {
    let heap = TrackingHeap::new();
    let snapshot = heap.snapshot();

    assert!(snapshot.malloced_memory > 0);
    assert!(snapshot.total_heap_size > 0);
    assert_eq!(snapshot.total_physical_size, snapshot.total_heap_size);
}

#[test]
fn test_allocation_window() {
    reset_allocation_counter();
    let buf = vec![0u8; MIB];
    let (bytes, count) = current_allocation();
    drop(buf);

    assert!(bytes >= MIB as u64);
    assert!(count >= 1);
}

#[test]
fn test_monotonic_clock_advances() {
    use fluxprobe::Clock;

    let clock = MonotonicClock::new();
    let a = clock.now();
    std::thread::sleep(Duration::from_millis(2));
    let b = clock.now();
    assert!(b - a >= 2.0);
}
