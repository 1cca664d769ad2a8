//! Per-call measurement options
//!
//! Every field has a documented default and construction always fills it, so
//! the harnesses never see a partially configured value.

use std::time::Duration;

/// Default number of measured iterations
pub const DEFAULT_ITERATIONS: usize = 1;

/// Default number of warmup iterations
pub const DEFAULT_WARMUP: usize = 0;

/// Default post-execution wait before the recorder is stopped
pub const DEFAULT_GC_TIMEOUT: Duration = Duration::from_millis(1);

/// Options for the timing harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfOptions {
    /// Measured iterations (default 1)
    pub iterations: usize,
    /// Unmeasured iterations run first (default 0)
    pub warmup: usize,
}

impl Default for PerfOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            warmup: DEFAULT_WARMUP,
        }
    }
}

impl PerfOptions {
    /// Set the measured iteration count
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the warmup iteration count
    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }
}

/// Options for the heap snapshot harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOptions {
    /// Invocations between the two snapshots (default 1)
    pub iterations: usize,
}

impl Default for MemOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl MemOptions {
    /// Set the iteration count
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

/// Options for the reclamation report harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcProfilerOptions {
    /// Invocations while the recorder runs (default 1)
    pub iterations: usize,
    /// Delay between the last invocation and `stop` (default 1ms)
    pub timeout: Duration,
}

impl Default for GcProfilerOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            timeout: DEFAULT_GC_TIMEOUT,
        }
    }
}

impl GcProfilerOptions {
    /// Set the iteration count
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the post-execution wait
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
