//! High-Precision Timing
//!
//! Harness timestamps are monotonic milliseconds as `f64`, read through the
//! [`Clock`] trait so tests can substitute a scripted clock.

use std::time::Instant;

/// Monotonic time source used by the harnesses.
pub trait Clock {
    /// Current timestamp in milliseconds. Only differences are meaningful.
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline(always)]
    fn now(&self) -> f64 {
        (**self).now()
    }
}

// ─── MonotonicClock ──────────────────────────────────────────────────────────

/// Millisecond clock anchored at its construction instant
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is "now"
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now(&self) -> f64 {
        self.origin.elapsed().as_nanos() as f64 / 1_000_000.0
    }
}

// ─── Timer ───────────────────────────────────────────────────────────────────

/// Wall-clock timer for whole runs
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed nanoseconds since `start`
    #[inline(always)]
    pub fn stop(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    /// Elapsed milliseconds since `start`
    pub fn elapsed_ms(&self) -> f64 {
        self.stop() as f64 / 1_000_000.0
    }
}

/// Set CPU affinity to pin the current thread to a specific core
///
/// Avoids core migrations between samples.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    // CPU_SET indexes a fixed-size bitset
    if cpu >= 8 * std::mem::size_of::<libc::cpu_set_t>() {
        return Err(std::io::Error::from_raw_os_error(libc::EINVAL));
    }

    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// Set CPU affinity (unsupported on this platform, always succeeds)
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}
