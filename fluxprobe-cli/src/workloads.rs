//! Built-in workloads
//!
//! Small, self-contained units of work for exercising the harnesses from the
//! command line. Each returns a checksum so the optimizer cannot drop it.

use rand::Rng;
use serde::Serialize;
use std::hint::black_box;
use std::time::Duration;

/// Workload selectable with `--workload`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Workload {
    /// Fill a fresh vector with random integers
    FillArray,
    /// Sum a range of integers (no allocation)
    Sum,
    /// Allocate and immediately drop many small buffers
    Churn,
    /// Sleep on the async timer
    Sleep,
}

impl Workload {
    /// All workloads, in listing order
    pub const ALL: [Workload; 4] = [
        Workload::FillArray,
        Workload::Sum,
        Workload::Churn,
        Workload::Sleep,
    ];

    /// Name accepted on the command line
    pub fn name(self) -> &'static str {
        match self {
            Workload::FillArray => "fill-array",
            Workload::Sum => "sum",
            Workload::Churn => "churn",
            Workload::Sleep => "sleep",
        }
    }

    /// One-line description for `list`
    pub fn description(self) -> &'static str {
        match self {
            Workload::FillArray => "fill 100000 slots with random integers",
            Workload::Sum => "sum the integers below 1000000",
            Workload::Churn => "allocate and drop 10000 small buffers",
            Workload::Sleep => "await a 1ms timer",
        }
    }

    /// Size argument handed to every invocation
    pub fn default_size(self) -> u64 {
        match self {
            Workload::FillArray => 100_000,
            Workload::Sum => 1_000_000,
            Workload::Churn => 10_000,
            Workload::Sleep => 1,
        }
    }

    /// Whether the workload should be driven through the async harnesses
    pub fn is_async(self) -> bool {
        matches!(self, Workload::Sleep)
    }

    /// Run once, blocking
    pub fn run(self, size: u64) -> u64 {
        match self {
            Workload::FillArray => fill_array(size as usize).len() as u64,
            Workload::Sum => sum_below(size),
            Workload::Churn => churn(size as usize),
            Workload::Sleep => {
                std::thread::sleep(Duration::from_millis(size));
                0
            }
        }
    }

    /// Run once on the async runtime
    pub async fn run_async(self, size: u64) -> u64 {
        match self {
            Workload::Sleep => {
                tokio::time::sleep(Duration::from_millis(size)).await;
                0
            }
            other => other.run(size),
        }
    }
}

impl std::str::FromStr for Workload {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Workload::ALL
            .into_iter()
            .find(|w| w.name() == wanted || w.name().replace('-', "_") == wanted)
            .ok_or_else(|| format!("Unknown workload: {}", s))
    }
}

fn fill_array(len: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    let mut values = vec![0u32; len];
    for slot in values.iter_mut() {
        *slot = rng.gen_range(0..1_000_000);
    }
    values
}

fn sum_below(n: u64) -> u64 {
    (0..black_box(n)).fold(0u64, |acc, i| acc.wrapping_add(i))
}

fn churn(rounds: usize) -> u64 {
    let mut checksum = 0u64;
    for i in 0..rounds {
        let buf = black_box(vec![i as u8; 64]);
        checksum = checksum.wrapping_add(buf[0] as u64);
    }
    checksum
}
