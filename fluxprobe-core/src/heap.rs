//! Heap Snapshots
//!
//! A snapshot is a point-in-time read of seven allocator counters. The
//! harness takes one before and one after the workload and reports the
//! field-wise difference. Deltas are signed: a shrinking field is a
//! meaningful negative value, not an error.

use crate::allocator::allocator_stats;
use crate::options::MemOptions;
use crate::probe::Probe;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::hint::black_box;
use std::sync::Once;
use tracing::debug;

/// Allocator/heap counters at one instant (bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    /// Peak live bytes seen by the allocator
    pub total_heap_size: u64,
    /// Bytes currently live
    pub used_heap_size: u64,
    /// Resident heap bytes (mirrors `total_heap_size`)
    pub total_physical_size: u64,
    /// Bytes left before `heap_size_limit`
    pub total_available_size: u64,
    /// Configured heap limit, `u64::MAX` when unlimited
    pub heap_size_limit: u64,
    /// Cumulative bytes handed out by the allocator
    pub malloced_memory: u64,
    /// Memory held outside the allocator (always 0)
    pub external_memory: u64,
}

/// Field-wise `after - before` of two snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapDelta {
    /// Change in peak live bytes
    pub total_heap_size: i64,
    /// Change in live bytes
    pub used_heap_size: i64,
    /// Change in resident heap bytes
    pub total_physical_size: i64,
    /// Change in headroom below the limit
    pub total_available_size: i64,
    /// Change in the configured limit
    pub heap_size_limit: i64,
    /// Bytes allocated in between
    pub malloced_memory: i64,
    /// Change in out-of-allocator memory
    pub external_memory: i64,
}

impl HeapDelta {
    /// Difference of every field, saturating at the `i64` range
    pub fn between(before: &HeapSnapshot, after: &HeapSnapshot) -> Self {
        Self {
            total_heap_size: signed_delta(before.total_heap_size, after.total_heap_size),
            used_heap_size: signed_delta(before.used_heap_size, after.used_heap_size),
            total_physical_size: signed_delta(
                before.total_physical_size,
                after.total_physical_size,
            ),
            total_available_size: signed_delta(
                before.total_available_size,
                after.total_available_size,
            ),
            heap_size_limit: signed_delta(before.heap_size_limit, after.heap_size_limit),
            malloced_memory: signed_delta(before.malloced_memory, after.malloced_memory),
            external_memory: signed_delta(before.external_memory, after.external_memory),
        }
    }
}

fn signed_delta(before: u64, after: u64) -> i64 {
    if after >= before {
        i64::try_from(after - before).unwrap_or(i64::MAX)
    } else {
        i64::try_from(before - after).map_or(i64::MIN, |d| -d)
    }
}

/// Source of heap snapshots
pub trait HeapStatsProvider {
    /// Read the current counters
    fn snapshot(&self) -> HeapSnapshot;
}

impl<P: HeapStatsProvider + ?Sized> HeapStatsProvider for &P {
    fn snapshot(&self) -> HeapSnapshot {
        (**self).snapshot()
    }
}

/// Heap view backed by [`TrackingAllocator`](crate::TrackingAllocator) counters
#[derive(Debug, Clone, Default)]
pub struct TrackingHeap {
    limit: Option<u64>,
}

static UNTRACKED_NOTICE: Once = Once::new();

impl TrackingHeap {
    /// Heap view with no configured limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Heap view reporting `limit` bytes as the heap size limit
    pub fn with_limit(limit: u64) -> Self {
        Self { limit: Some(limit) }
    }

    /// The configured limit, if any
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

impl HeapStatsProvider for TrackingHeap {
    fn snapshot(&self) -> HeapSnapshot {
        let stats = allocator_stats();
        if !stats.is_tracking() {
            UNTRACKED_NOTICE.call_once(|| {
                debug!("TrackingAllocator is not the global allocator; heap counters read zero");
            });
        }

        let limit = self.limit.unwrap_or(u64::MAX);
        HeapSnapshot {
            total_heap_size: stats.peak_bytes,
            used_heap_size: stats.live_bytes,
            total_physical_size: stats.peak_bytes,
            total_available_size: limit.saturating_sub(stats.live_bytes),
            heap_size_limit: limit,
            malloced_memory: stats.allocated_bytes,
            external_memory: 0,
        }
    }
}

/// Heap state around a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapStatsResult {
    /// Snapshot taken before the first invocation
    pub before: HeapSnapshot,
    /// Snapshot taken after the last invocation
    pub after: HeapSnapshot,
    /// `after - before`
    pub delta: HeapDelta,
}

impl HeapStatsResult {
    /// Pair two snapshots with their delta
    pub fn new(before: HeapSnapshot, after: HeapSnapshot) -> Self {
        Self {
            before,
            after,
            delta: HeapDelta::between(&before, &after),
        }
    }
}

impl<C, H: HeapStatsProvider, R> Probe<C, H, R> {
    /// Snapshot, run `f` `options.iterations` times, snapshot again.
    ///
    /// The callable's return values are dropped; only its effect on the heap
    /// is reported.
    pub fn heap_stats<A, T, F>(&self, mut f: F, options: &MemOptions, args: A) -> HeapStatsResult
    where
        A: Clone,
        F: FnMut(A) -> T,
    {
        match self.try_heap_stats(|input| Ok::<T, Infallible>(f(input)), options, args) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Fallible variant: the first error aborts before the second snapshot.
    pub fn try_heap_stats<A, T, E, F>(
        &self,
        mut f: F,
        options: &MemOptions,
        args: A,
    ) -> Result<HeapStatsResult, E>
    where
        A: Clone,
        F: FnMut(A) -> Result<T, E>,
    {
        let before = self.heap.snapshot();
        for _ in 0..options.iterations {
            let _ = black_box(f(args.clone())?);
        }
        let after = self.heap.snapshot();

        Ok(self.finish_heap(before, after, options))
    }

    /// Async variant, awaiting each call in turn
    pub async fn heap_stats_async<A, T, F, Fut>(
        &self,
        mut f: F,
        options: &MemOptions,
        args: A,
    ) -> HeapStatsResult
    where
        A: Clone,
        F: FnMut(A) -> Fut,
        Fut: Future<Output = T>,
    {
        let wrapped = |input: A| {
            let fut = f(input);
            async move { Ok::<T, Infallible>(fut.await) }
        };
        match self.try_heap_stats_async(wrapped, options, args).await {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Fallible async variant
    pub async fn try_heap_stats_async<A, T, E, F, Fut>(
        &self,
        mut f: F,
        options: &MemOptions,
        args: A,
    ) -> Result<HeapStatsResult, E>
    where
        A: Clone,
        F: FnMut(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let before = self.heap.snapshot();
        for _ in 0..options.iterations {
            let _ = black_box(f(args.clone()).await?);
        }
        let after = self.heap.snapshot();

        Ok(self.finish_heap(before, after, options))
    }

    fn finish_heap(
        &self,
        before: HeapSnapshot,
        after: HeapSnapshot,
        options: &MemOptions,
    ) -> HeapStatsResult {
        let result = HeapStatsResult::new(before, after);
        debug!(
            iterations = options.iterations,
            used_delta = result.delta.used_heap_size,
            malloced_delta = result.delta.malloced_memory,
            "heap run complete"
        );
        result
    }
}
