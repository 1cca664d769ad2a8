//! Reclamation Reports
//!
//! A recorder is started before the workload and stopped after a fixed delay;
//! whatever it accumulated in between is returned untouched. The delay gives
//! deferred reclamation work a chance to land in the window. It is not a
//! deadline on the workload.
//!
//! The built-in [`ReclaimRecorder`] reports the deallocation traffic seen by
//! the tracking allocator. Any other recorder can be plugged in through
//! [`RecorderFactory`].

use crate::allocator::{AllocatorStats, allocator_stats};
use crate::heap::{HeapSnapshot, HeapStatsProvider, TrackingHeap};
use crate::measure::{Clock, MonotonicClock};
use crate::options::GcProfilerOptions;
use crate::probe::Probe;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::hint::black_box;
use tracing::{debug, warn};

/// Report format version emitted by [`ReclaimRecorder`]
pub const GC_REPORT_VERSION: u32 = 1;

/// Stateful recorder of collector activity
pub trait ActivityRecorder {
    /// What `stop` hands back
    type Report;

    /// Begin recording
    fn start(&mut self);

    /// Stop recording and return everything accumulated since `start`
    fn stop(&mut self) -> Self::Report;
}

/// Creates one recorder per harness call
pub trait RecorderFactory {
    /// Recorder type produced
    type Recorder: ActivityRecorder;

    /// Create a fresh, not yet started recorder
    fn create(&self) -> Self::Recorder;
}

impl<F, R> RecorderFactory for F
where
    F: Fn() -> R,
    R: ActivityRecorder,
{
    type Recorder = R;

    fn create(&self) -> R {
        self()
    }
}

type ReportOf<R> = <<R as RecorderFactory>::Recorder as ActivityRecorder>::Report;

/// Reclamation activity between `start` and `stop`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcReport {
    /// Report format version
    pub version: u32,
    /// Recorder clock reading at `start` (ms)
    pub start_time: f64,
    /// Recorder clock reading at `stop` (ms)
    pub end_time: f64,
    /// Recorded events, in order
    pub samples: Vec<GcEvent>,
}

/// One reclamation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcEvent {
    /// Bytes returned to the allocator
    pub freed_bytes: u64,
    /// Number of frees
    pub freed_count: u64,
    /// Bytes allocated over the same window
    pub allocated_bytes: u64,
    /// Number of allocations over the same window
    pub allocated_count: u64,
    /// Window length (ms)
    pub cost: f64,
    /// Heap state when recording started
    pub before: HeapSnapshot,
    /// Heap state when recording stopped
    pub after: HeapSnapshot,
}

struct Window {
    start_time: f64,
    before: HeapSnapshot,
    counters: AllocatorStats,
}

/// Recorder reporting the tracking allocator's free traffic as one event
pub struct ReclaimRecorder {
    clock: MonotonicClock,
    heap: TrackingHeap,
    window: Option<Window>,
}

impl ReclaimRecorder {
    /// Recorder reading `heap` and timestamping with `clock`
    pub fn new(clock: MonotonicClock, heap: TrackingHeap) -> Self {
        Self {
            clock,
            heap,
            window: None,
        }
    }
}

impl ActivityRecorder for ReclaimRecorder {
    type Report = GcReport;

    fn start(&mut self) {
        self.window = Some(Window {
            start_time: self.clock.now(),
            before: self.heap.snapshot(),
            counters: allocator_stats(),
        });
    }

    fn stop(&mut self) -> GcReport {
        let end_time = self.clock.now();
        let Some(window) = self.window.take() else {
            return GcReport {
                version: GC_REPORT_VERSION,
                start_time: end_time,
                end_time,
                samples: Vec::new(),
            };
        };

        let counters = allocator_stats();
        let freed_count = counters.free_count.saturating_sub(window.counters.free_count);

        let mut samples = Vec::new();
        if freed_count > 0 {
            samples.push(GcEvent {
                freed_bytes: counters.freed_bytes.saturating_sub(window.counters.freed_bytes),
                freed_count,
                allocated_bytes: counters
                    .allocated_bytes
                    .saturating_sub(window.counters.allocated_bytes),
                allocated_count: counters
                    .allocation_count
                    .saturating_sub(window.counters.allocation_count),
                cost: end_time - window.start_time,
                before: window.before,
                after: self.heap.snapshot(),
            });
        }

        GcReport {
            version: GC_REPORT_VERSION,
            start_time: window.start_time,
            end_time,
            samples,
        }
    }
}

/// Default factory for [`ReclaimRecorder`]
#[derive(Debug, Clone, Default)]
pub struct ReclaimRecorderFactory {
    clock: MonotonicClock,
    heap: TrackingHeap,
}

impl ReclaimRecorderFactory {
    /// Factory whose recorders report `heap` (e.g. with a configured limit)
    pub fn with_heap(heap: TrackingHeap) -> Self {
        Self {
            clock: MonotonicClock::new(),
            heap,
        }
    }
}

impl RecorderFactory for ReclaimRecorderFactory {
    type Recorder = ReclaimRecorder;

    fn create(&self) -> ReclaimRecorder {
        ReclaimRecorder::new(self.clock, self.heap.clone())
    }
}

impl<C, H, R: RecorderFactory> Probe<C, H, R> {
    /// Record collector activity around a synchronous callable.
    ///
    /// Return values are discarded.
    pub async fn gc_profile<A, T, F>(
        &self,
        mut f: F,
        options: &GcProfilerOptions,
        args: A,
    ) -> ReportOf<R>
    where
        A: Clone,
        F: FnMut(A) -> T,
    {
        self.try_gc_profile(|input| Ok::<T, Infallible>(f(input)), options, args)
            .await
    }

    /// Like [`gc_profile`](Self::gc_profile) for a fallible callable.
    ///
    /// Errors do not stop the run and are not returned: each one is logged
    /// and the next iteration proceeds.
    pub async fn try_gc_profile<A, T, E, F>(
        &self,
        mut f: F,
        options: &GcProfilerOptions,
        args: A,
    ) -> ReportOf<R>
    where
        A: Clone,
        E: Display,
        F: FnMut(A) -> Result<T, E>,
    {
        let mut recorder = self.recorder.create();
        recorder.start();

        for iteration in 0..options.iterations {
            match f(args.clone()) {
                Ok(value) => {
                    let _ = black_box(value);
                }
                Err(err) => warn!(iteration, error = %err, "discarding workload error"),
            }
        }

        tokio::time::sleep(options.timeout).await;
        debug!(iterations = options.iterations, timeout = ?options.timeout, "gc profile complete");
        recorder.stop()
    }

    /// Record collector activity around an async callable, awaiting each call.
    pub async fn gc_profile_async<A, T, F, Fut>(
        &self,
        mut f: F,
        options: &GcProfilerOptions,
        args: A,
    ) -> ReportOf<R>
    where
        A: Clone,
        F: FnMut(A) -> Fut,
        Fut: Future<Output = T>,
    {
        let wrapped = |input: A| {
            let fut = f(input);
            async move { Ok::<T, Infallible>(fut.await) }
        };
        match self.try_gc_profile_async(wrapped, options, args).await {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    /// Fallible async variant.
    ///
    /// The first error aborts the run. The recorder is still stopped on that
    /// path; its report is dropped.
    pub async fn try_gc_profile_async<A, T, E, F, Fut>(
        &self,
        mut f: F,
        options: &GcProfilerOptions,
        args: A,
    ) -> Result<ReportOf<R>, E>
    where
        A: Clone,
        F: FnMut(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut recorder = self.recorder.create();
        recorder.start();

        for iteration in 0..options.iterations {
            match f(args.clone()).await {
                Ok(value) => {
                    let _ = black_box(value);
                }
                Err(err) => {
                    let _ = recorder.stop();
                    debug!(iteration, "workload failed, recorder stopped");
                    return Err(err);
                }
            }
        }

        tokio::time::sleep(options.timeout).await;
        debug!(iterations = options.iterations, timeout = ?options.timeout, "gc profile complete");
        Ok(recorder.stop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    /// Lifecycle log shared between a factory and its recorders
    #[derive(Default)]
    struct Calls {
        created: Cell<usize>,
        started: Cell<usize>,
        stopped: Cell<usize>,
        stopped_at: RefCell<Option<tokio::time::Instant>>,
    }

    struct FakeRecorder {
        calls: Rc<Calls>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct FakeReport {
        version: u32,
        start_time: u64,
        end_time: u64,
    }

    fn fake_report() -> FakeReport {
        FakeReport {
            version: 1,
            start_time: 1000,
            end_time: 2000,
        }
    }

    impl ActivityRecorder for FakeRecorder {
        type Report = FakeReport;

        fn start(&mut self) {
            self.calls.started.set(self.calls.started.get() + 1);
        }

        fn stop(&mut self) -> FakeReport {
            self.calls.stopped.set(self.calls.stopped.get() + 1);
            *self.calls.stopped_at.borrow_mut() = Some(tokio::time::Instant::now());
            fake_report()
        }
    }

    fn fake_probe() -> (
        Probe<MonotonicClock, TrackingHeap, impl RecorderFactory<Recorder = FakeRecorder>>,
        Rc<Calls>,
    ) {
        let calls = Rc::new(Calls::default());
        let shared = calls.clone();
        let factory = move || {
            shared.created.set(shared.created.get() + 1);
            FakeRecorder {
                calls: shared.clone(),
            }
        };
        (Probe::new().with_recorder(factory), calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_creates_starts_and_stops_once() {
        let (probe, calls) = fake_probe();
        let report = probe
            .gc_profile(|_| "test", &GcProfilerOptions::default(), ())
            .await;

        assert_eq!(report, fake_report());
        assert_eq!(calls.created.get(), 1);
        assert_eq!(calls.started.get(), 1);
        assert_eq!(calls.stopped.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_iterations_and_arguments() {
        let (probe, _calls) = fake_probe();
        let seen = RefCell::new(Vec::new());
        probe
            .gc_profile(
                |(word, n): (&'static str, i32)| seen.borrow_mut().push((word, n)),
                &GcProfilerOptions::default().with_iterations(3),
                ("test", 42),
            )
            .await;

        assert_eq!(*seen.borrow(), vec![("test", 42); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_timeout() {
        let (probe, calls) = fake_probe();
        let started = tokio::time::Instant::now();
        probe
            .gc_profile(
                |_| (),
                &GcProfilerOptions::default().with_timeout(Duration::from_millis(5000)),
                (),
            )
            .await;

        let stopped_at = (*calls.stopped_at.borrow()).expect("recorder stopped");
        assert!(stopped_at - started >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_stop_waits_for_timeout() {
        let (probe, calls) = fake_probe();
        let started = tokio::time::Instant::now();
        probe
            .gc_profile_async(
                |_| async { tokio::time::sleep(Duration::from_millis(10)).await },
                &GcProfilerOptions::default()
                    .with_iterations(2)
                    .with_timeout(Duration::from_millis(5000)),
                (),
            )
            .await;

        let stopped_at = (*calls.stopped_at.borrow()).expect("recorder stopped");
        assert!(stopped_at - started >= Duration::from_millis(5020));
        assert_eq!(calls.stopped.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_errors_are_discarded() {
        let (probe, calls) = fake_probe();
        let attempts = Cell::new(0);
        let report = probe
            .try_gc_profile(
                |_| -> Result<(), &'static str> {
                    attempts.set(attempts.get() + 1);
                    Err("ignored")
                },
                &GcProfilerOptions::default().with_iterations(2),
                (),
            )
            .await;

        assert_eq!(report, fake_report());
        assert_eq!(attempts.get(), 2);
        assert_eq!(calls.stopped.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_awaits_every_iteration() {
        let (probe, _calls) = fake_probe();
        let finished = Cell::new(0);
        let counter = &finished;
        probe
            .gc_profile_async(
                move |_| async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    counter.set(counter.get() + 1);
                },
                &GcProfilerOptions::default().with_iterations(3),
                (),
            )
            .await;

        assert_eq!(finished.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_error_stops_recorder() {
        let (probe, calls) = fake_probe();
        let outcome = probe
            .try_gc_profile_async(
                |_| async { Err::<(), _>("rejected") },
                &GcProfilerOptions::default().with_iterations(3),
                (),
            )
            .await;

        assert_eq!(outcome.unwrap_err(), "rejected");
        assert_eq!(calls.started.get(), 1);
        assert_eq!(calls.stopped.get(), 1);
    }

    #[test]
    fn test_reclaim_recorder_reports_frees() {
        let mut recorder = ReclaimRecorderFactory::default().create();
        recorder.start();
        crate::allocator::record_alloc(2048);
        crate::allocator::record_free(2048);
        let report = recorder.stop();

        assert_eq!(report.version, GC_REPORT_VERSION);
        assert!(report.end_time >= report.start_time);
        assert_eq!(report.samples.len(), 1);
        assert!(report.samples[0].freed_bytes >= 2048);
        assert!(report.samples[0].freed_count >= 1);
    }

    #[test]
    fn test_reclaim_recorder_stop_without_start() {
        let mut recorder = ReclaimRecorderFactory::default().create();
        let report = recorder.stop();

        assert!(report.samples.is_empty());
        assert_eq!(report.start_time, report.end_time);
    }
}
