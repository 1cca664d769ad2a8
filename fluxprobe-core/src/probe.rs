//! Probe - collaborator bundle behind every harness
//!
//! The harness operations themselves live next to the data they produce
//! (`timing`, `heap`, `gc`); this module only owns construction.

use crate::gc::ReclaimRecorderFactory;
use crate::heap::TrackingHeap;
use crate::measure::MonotonicClock;

/// Clock, heap snapshot provider and recorder factory used by the harnesses.
///
/// `Probe::new()` wires the defaults: a monotonic clock, the tracking
/// allocator's heap view, and the reclamation recorder. Swap any of them with
/// the `with_*` methods.
#[derive(Debug, Clone, Default)]
pub struct Probe<C = MonotonicClock, H = TrackingHeap, R = ReclaimRecorderFactory> {
    pub(crate) clock: C,
    pub(crate) heap: H,
    pub(crate) recorder: R,
}

impl Probe {
    /// Probe with the default collaborators
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C, H, R> Probe<C, H, R> {
    /// Replace the clock
    pub fn with_clock<C2>(self, clock: C2) -> Probe<C2, H, R> {
        Probe {
            clock,
            heap: self.heap,
            recorder: self.recorder,
        }
    }

    /// Replace the heap snapshot provider
    pub fn with_heap<H2>(self, heap: H2) -> Probe<C, H2, R> {
        Probe {
            clock: self.clock,
            heap,
            recorder: self.recorder,
        }
    }

    /// Replace the recorder factory
    pub fn with_recorder<R2>(self, recorder: R2) -> Probe<C, H, R2> {
        Probe {
            clock: self.clock,
            heap: self.heap,
            recorder,
        }
    }

    /// The clock in use
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The heap snapshot provider in use
    pub fn heap(&self) -> &H {
        &self.heap
    }

    /// The recorder factory in use
    pub fn recorder(&self) -> &R {
        &self.recorder
    }
}
