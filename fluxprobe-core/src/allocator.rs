//! Allocation Tracking
//!
//! `TrackingAllocator` forwards to the system allocator and maintains
//! process-wide counters. Install it with `#[global_allocator]` to make the
//! default heap provider report real numbers; without it every counter stays
//! at zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);
static FREED_BYTES: AtomicU64 = AtomicU64::new(0);
static FREE_COUNT: AtomicU64 = AtomicU64::new(0);
static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static PEAK_BYTES: AtomicU64 = AtomicU64::new(0);

// Resettable window for `current_allocation`
static WINDOW_BYTES: AtomicU64 = AtomicU64::new(0);
static WINDOW_COUNT: AtomicU64 = AtomicU64::new(0);

/// Global allocator wrapper that counts allocations and frees.
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: fluxprobe::TrackingAllocator = fluxprobe::TrackingAllocator;
/// ```
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size() as u64);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_alloc(layout.size() as u64);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        record_free(layout.size() as u64);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            // A successful realloc releases the old block and owns a new one
            record_free(layout.size() as u64);
            record_alloc(new_size as u64);
        }
        new_ptr
    }
}

#[inline]
pub(crate) fn record_alloc(size: u64) {
    ALLOCATED_BYTES.fetch_add(size, Ordering::Relaxed);
    ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
    WINDOW_BYTES.fetch_add(size, Ordering::Relaxed);
    WINDOW_COUNT.fetch_add(1, Ordering::Relaxed);

    let live = LIVE_BYTES.fetch_add(size, Ordering::Relaxed) + size;
    PEAK_BYTES.fetch_max(live, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_free(size: u64) {
    FREED_BYTES.fetch_add(size, Ordering::Relaxed);
    FREE_COUNT.fetch_add(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_sub(size, Ordering::Relaxed);
}

/// Cumulative allocator counters since process start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Total bytes ever allocated
    pub allocated_bytes: u64,
    /// Number of allocations
    pub allocation_count: u64,
    /// Total bytes ever freed
    pub freed_bytes: u64,
    /// Number of frees
    pub free_count: u64,
    /// Bytes currently allocated
    pub live_bytes: u64,
    /// High-water mark of `live_bytes`
    pub peak_bytes: u64,
}

impl AllocatorStats {
    /// Whether the tracking allocator has observed any traffic
    pub fn is_tracking(&self) -> bool {
        self.allocation_count > 0
    }
}

/// Read the cumulative counters
pub fn allocator_stats() -> AllocatorStats {
    AllocatorStats {
        allocated_bytes: ALLOCATED_BYTES.load(Ordering::Relaxed),
        allocation_count: ALLOCATION_COUNT.load(Ordering::Relaxed),
        freed_bytes: FREED_BYTES.load(Ordering::Relaxed),
        free_count: FREE_COUNT.load(Ordering::Relaxed),
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
        peak_bytes: PEAK_BYTES.load(Ordering::Relaxed),
    }
}

/// Bytes and allocation count since the last `reset_allocation_counter`
pub fn current_allocation() -> (u64, u64) {
    (
        WINDOW_BYTES.load(Ordering::Relaxed),
        WINDOW_COUNT.load(Ordering::Relaxed),
    )
}

/// Restart the `current_allocation` window
pub fn reset_allocation_counter() {
    WINDOW_BYTES.store(0, Ordering::Relaxed);
    WINDOW_COUNT.store(0, Ordering::Relaxed);
}
