//! FluxProbe Example: reclamation report around an array fill
//!
//! Fills a 100k-slot vector with random integers ten times, waits three
//! seconds for reclamation to settle, then prints the collector report.
//!
//! ```text
//! cargo run -p fluxprobe --example gc_report
//! ```

use fluxprobe::prelude::*;
use rand::Rng;
use std::time::Duration;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn fill_array(len: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(0..1_000_000)).collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let options = GcProfilerOptions::default()
        .with_iterations(10)
        .with_timeout(Duration::from_millis(3000));

    let report = fluxprobe::gc_profile(fill_array, &options, 100_000).await;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("PROF: {}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
