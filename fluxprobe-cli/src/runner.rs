//! Run plan execution
//!
//! Drives the selected harnesses over one workload on a current-thread
//! runtime and assembles the [`ProbeReport`].

use crate::output::{ProbeReport, ReportMeta};
use crate::workloads::Workload;
use chrono::Utc;
use fluxprobe_core::{
    GcProfilerOptions, MemOptions, PerfOptions, Probe, ReclaimRecorderFactory, Timer,
    TrackingHeap, allocator_stats, pin_to_cpu,
};
use tracing::{info, warn};

/// Which harnesses a run includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Harnesses {
    /// Timing harness
    pub timing: bool,
    /// Heap snapshot harness
    pub heap: bool,
    /// Reclamation report harness
    pub gc: bool,
}

impl Harnesses {
    /// Every harness
    pub const ALL: Harnesses = Harnesses {
        timing: true,
        heap: true,
        gc: true,
    };

    /// Only the timing harness
    pub const TIMING: Harnesses = Harnesses {
        timing: true,
        heap: false,
        gc: false,
    };

    /// Only the heap snapshot harness
    pub const HEAP: Harnesses = Harnesses {
        timing: false,
        heap: true,
        gc: false,
    };

    /// Only the reclamation report harness
    pub const GC: Harnesses = Harnesses {
        timing: false,
        heap: false,
        gc: true,
    };
}

/// Fully resolved run: config file values with command-line overrides applied
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Workload to profile
    pub workload: Workload,
    /// Size argument handed to each invocation
    pub size: u64,
    /// Harnesses to run, in timing, heap, gc order
    pub harnesses: Harnesses,
    /// Timing harness options
    pub perf: PerfOptions,
    /// Heap snapshot harness options
    pub mem: MemOptions,
    /// Reclamation report harness options
    pub gc: GcProfilerOptions,
    /// Heap size limit to report
    pub heap_limit: Option<u64>,
    /// CPU to pin the measuring thread to
    pub pin_cpu: Option<usize>,
}

/// Execute a plan and collect every harness result into one report
pub fn execute(plan: &RunPlan) -> anyhow::Result<ProbeReport> {
    if let Some(cpu) = plan.pin_cpu {
        match pin_to_cpu(cpu) {
            Ok(()) => info!(cpu, "pinned measuring thread"),
            Err(e) => warn!(cpu, "failed to pin measuring thread: {e}"),
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let heap = match plan.heap_limit {
        Some(limit) => TrackingHeap::with_limit(limit),
        None => TrackingHeap::new(),
    };
    let probe = Probe::new()
        .with_heap(heap.clone())
        .with_recorder(ReclaimRecorderFactory::with_heap(heap));

    let workload = plan.workload;
    let size = plan.size;
    let timer = Timer::start();

    let (timing, heap, gc) = runtime.block_on(async {
        let timing = if plan.harnesses.timing {
            info!(workload = workload.name(), iterations = plan.perf.iterations, "timing");
            Some(if workload.is_async() {
                probe
                    .perf_async(|n: u64| workload.run_async(n), &plan.perf, size)
                    .await
            } else {
                probe.perf(|n: u64| workload.run(n), &plan.perf, size)
            })
        } else {
            None
        };

        let heap = if plan.harnesses.heap {
            info!(workload = workload.name(), iterations = plan.mem.iterations, "heap snapshot");
            Some(if workload.is_async() {
                probe
                    .heap_stats_async(|n: u64| workload.run_async(n), &plan.mem, size)
                    .await
            } else {
                probe.heap_stats(|n: u64| workload.run(n), &plan.mem, size)
            })
        } else {
            None
        };

        let gc = if plan.harnesses.gc {
            info!(
                workload = workload.name(),
                iterations = plan.gc.iterations,
                timeout = ?plan.gc.timeout,
                "collector report"
            );
            Some(if workload.is_async() {
                probe
                    .gc_profile_async(|n: u64| workload.run_async(n), &plan.gc, size)
                    .await
            } else {
                probe
                    .gc_profile(|n: u64| workload.run(n), &plan.gc, size)
                    .await
            })
        } else {
            None
        };

        (timing, heap, gc)
    });

    let meta = ReportMeta {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        tracking_allocator: allocator_stats().is_tracking(),
        wall_time_ms: timer.elapsed_ms(),
    };

    Ok(ProbeReport {
        meta,
        workload,
        timing,
        heap,
        gc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn plan(workload: Workload, harnesses: Harnesses) -> RunPlan {
        RunPlan {
            workload,
            size: 10,
            harnesses,
            perf: PerfOptions::default().with_iterations(3).with_warmup(1),
            mem: MemOptions::default().with_iterations(2),
            gc: GcProfilerOptions::default()
                .with_iterations(2)
                .with_timeout(Duration::from_millis(1)),
            heap_limit: Some(1 << 30),
            pin_cpu: None,
        }
    }

    #[test]
    fn test_execute_all_harnesses() {
        let report = execute(&plan(Workload::Sum, Harnesses::ALL)).unwrap();

        let timing = report.timing.unwrap();
        assert_eq!(timing.stats.iterations, 3);
        assert_eq!(timing.stats.warmup_iterations, 1);
        assert_eq!(timing.result, Some(45));

        let heap = report.heap.unwrap();
        assert_eq!(heap.before.heap_size_limit, 1 << 30);
        assert_eq!(heap.delta.heap_size_limit, 0);

        let gc = report.gc.unwrap();
        assert!(gc.end_time >= gc.start_time);
        assert!(report.meta.wall_time_ms >= 1.0);
        assert_eq!(report.workload, Workload::Sum);
    }

    #[test]
    fn test_execute_selected_harness_only() {
        let report = execute(&plan(Workload::Sum, Harnesses::TIMING)).unwrap();
        assert!(report.timing.is_some());
        assert!(report.heap.is_none());
        assert!(report.gc.is_none());

        let report = execute(&plan(Workload::Churn, Harnesses::HEAP)).unwrap();
        assert!(report.timing.is_none());
        assert!(report.heap.is_some());
    }

    #[test]
    fn test_execute_survives_unpinnable_cpu() {
        let mut plan = plan(Workload::Sum, Harnesses::TIMING);
        plan.pin_cpu = Some(5000);

        let report = execute(&plan).unwrap();
        assert_eq!(report.timing.unwrap().result, Some(45));
    }

    #[test]
    fn test_execute_async_workload() {
        let mut plan = plan(Workload::Sleep, Harnesses::TIMING);
        plan.size = 2;
        let report = execute(&plan).unwrap();

        let stats = report.timing.unwrap().stats;
        assert_eq!(stats.times.len(), 3);
        assert!(stats.min >= 1.0);
    }
}
