//! Timing Harness
//!
//! Runs a callable `warmup` times untimed, then `iterations` times with a
//! timestamp read before and after each call. Durations feed
//! [`compute_stats`]; the value of the last measured call is returned with
//! them.
//!
//! The argument is cloned before the timer starts, so the clone never shows
//! up in a sample. Errors from `try_*` callables abort the run and surface
//! unchanged.

use crate::measure::Clock;
use crate::options::PerfOptions;
use crate::probe::Probe;
use fluxprobe_stats::{PerfStats, compute_stats};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::hint::black_box;
use tracing::{debug, trace};

/// Outcome of a timing run
#[derive(Debug, Clone, Serialize)]
pub struct PerfResult<T> {
    /// Statistics over the measured samples
    pub stats: PerfStats,
    /// Value returned by the last measured call (`None` for zero iterations)
    pub result: Option<T>,
}

impl<C: Clock, H, R> Probe<C, H, R> {
    /// Time an infallible callable.
    ///
    /// ```ignore
    /// let probe = Probe::new();
    /// let run = probe.perf(|(a, b): (u64, u64)| a * b, &PerfOptions::default(), (6, 7));
    /// assert_eq!(run.result, Some(42));
    /// ```
    pub fn perf<A, T, F>(&self, mut f: F, options: &PerfOptions, args: A) -> PerfResult<T>
    where
        A: Clone,
        F: FnMut(A) -> T,
    {
        match self.try_perf(|input| Ok::<T, Infallible>(f(input)), options, args) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Time a fallible callable; the first error aborts the run.
    pub fn try_perf<A, T, E, F>(
        &self,
        mut f: F,
        options: &PerfOptions,
        args: A,
    ) -> Result<PerfResult<T>, E>
    where
        A: Clone,
        F: FnMut(A) -> Result<T, E>,
    {
        for _ in 0..options.warmup {
            let _ = black_box(f(args.clone())?);
        }

        let mut times = Vec::with_capacity(options.iterations);
        let mut last = None;

        for iteration in 0..options.iterations {
            let input = args.clone();

            let start = self.clock.now();
            let value = black_box(f(input)?);
            let elapsed = self.clock.now() - start;

            trace!(iteration, elapsed_ms = elapsed, "timed iteration");
            times.push(elapsed);
            last = Some(value);
        }

        Ok(self.finish(times, options, last))
    }

    /// Time an async callable, awaiting each call before the end timestamp.
    pub async fn perf_async<A, T, F, Fut>(
        &self,
        mut f: F,
        options: &PerfOptions,
        args: A,
    ) -> PerfResult<T>
    where
        A: Clone,
        F: FnMut(A) -> Fut,
        Fut: Future<Output = T>,
    {
        let wrapped = |input: A| {
            let fut = f(input);
            async move { Ok::<T, Infallible>(fut.await) }
        };
        match self.try_perf_async(wrapped, options, args).await {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Time a fallible async callable; the first error aborts the run.
    pub async fn try_perf_async<A, T, E, F, Fut>(
        &self,
        mut f: F,
        options: &PerfOptions,
        args: A,
    ) -> Result<PerfResult<T>, E>
    where
        A: Clone,
        F: FnMut(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        for _ in 0..options.warmup {
            let _ = black_box(f(args.clone()).await?);
        }

        let mut times = Vec::with_capacity(options.iterations);
        let mut last = None;

        for iteration in 0..options.iterations {
            let input = args.clone();

            let start = self.clock.now();
            let value = black_box(f(input).await?);
            let elapsed = self.clock.now() - start;

            trace!(iteration, elapsed_ms = elapsed, "timed async iteration");
            times.push(elapsed);
            last = Some(value);
        }

        Ok(self.finish(times, options, last))
    }

    fn finish<T>(&self, times: Vec<f64>, options: &PerfOptions, last: Option<T>) -> PerfResult<T> {
        let stats = compute_stats(times, options.warmup);
        debug!(
            iterations = stats.iterations,
            warmup = stats.warmup_iterations,
            avg_ms = stats.avg,
            "timing run complete"
        );
        PerfResult {
            stats,
            result: last,
        }
    }
}
