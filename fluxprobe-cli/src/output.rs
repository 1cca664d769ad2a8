//! Report assembly and output formatting
//!
//! A run produces one [`ProbeReport`]; it is rendered either as
//! terminal-friendly text or as pretty JSON.

use crate::workloads::Workload;
use chrono::{DateTime, Utc};
use fluxprobe_core::{GcReport, HeapStatsResult, PerfResult};
use serde::Serialize;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Human,
    /// JSON with run metadata
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    /// Tool version
    pub version: String,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// Whether the tracking allocator saw any traffic
    pub tracking_allocator: bool,
    /// Wall time of the whole run (ms)
    pub wall_time_ms: f64,
}

/// Everything measured in one CLI run
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Run metadata
    pub meta: ReportMeta,
    /// Workload that was profiled
    pub workload: Workload,
    /// Timing harness output
    pub timing: Option<PerfResult<u64>>,
    /// Heap snapshot harness output
    pub heap: Option<HeapStatsResult>,
    /// Reclamation report harness output
    pub gc: Option<GcReport>,
}

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &ProbeReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &ProbeReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("FluxProbe Results\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "Workload: {} ({})\n\n",
        report.workload.name(),
        report.workload.description()
    ));

    if let Some(timing) = &report.timing {
        let stats = &timing.stats;
        output.push_str(&format!(
            "Timing: {} iterations, {} warmup\n",
            stats.iterations, stats.warmup_iterations
        ));
        output.push_str(&"-".repeat(60));
        output.push('\n');
        if stats.is_empty() {
            output.push_str("  no measured iterations\n");
        } else {
            output.push_str(&format!(
                "  avg: {}  median: {}  stddev: {}\n",
                format_ms(stats.avg),
                format_ms(stats.median),
                format_ms(stats.stddev)
            ));
            output.push_str(&format!(
                "  min: {}  max: {}  total: {}\n",
                format_ms(stats.min),
                format_ms(stats.max),
                format_ms(stats.total)
            ));
            output.push_str(&format!(
                "  cv: {:.2}%\n",
                stats.coefficient_of_variation()
            ));
        }
        output.push('\n');
    }

    if let Some(heap) = &report.heap {
        let delta = &heap.delta;
        output.push_str("Heap delta\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "  used: {}  total: {}  physical: {}\n",
            format_signed_bytes(delta.used_heap_size),
            format_signed_bytes(delta.total_heap_size),
            format_signed_bytes(delta.total_physical_size)
        ));
        output.push_str(&format!(
            "  available: {}  limit: {}\n",
            format_signed_bytes(delta.total_available_size),
            format_signed_bytes(delta.heap_size_limit)
        ));
        output.push_str(&format!(
            "  malloced: {}  external: {}\n",
            format_signed_bytes(delta.malloced_memory),
            format_signed_bytes(delta.external_memory)
        ));
        output.push('\n');
    }

    if let Some(gc) = &report.gc {
        output.push_str(&format!(
            "Collector report v{}: window {}\n",
            gc.version,
            format_ms(gc.end_time - gc.start_time)
        ));
        output.push_str(&"-".repeat(60));
        output.push('\n');
        if gc.samples.is_empty() {
            output.push_str("  no reclamation recorded\n");
        }
        for event in &gc.samples {
            output.push_str(&format!(
                "  freed {} in {} frees, allocated {} in {} allocations\n",
                format_signed_bytes(saturating_i64(event.freed_bytes)),
                event.freed_count,
                format_signed_bytes(saturating_i64(event.allocated_bytes)),
                event.allocated_count
            ));
        }
        output.push('\n');
    }

    if !report.meta.tracking_allocator {
        output.push_str("note: heap counters read zero without the tracking allocator\n");
    }
    output.push_str(&format!(
        "Completed in {}\n",
        format_ms(report.meta.wall_time_ms)
    ));

    output
}

fn saturating_i64(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

/// Format a millisecond value with an adaptive unit
pub fn format_ms(ms: f64) -> String {
    if ms.is_nan() {
        "n/a".to_string()
    } else if ms < 0.001 {
        format!("{:.2} ns", ms * 1_000_000.0)
    } else if ms < 1.0 {
        format!("{:.2} us", ms * 1_000.0)
    } else if ms < 1_000.0 {
        format!("{:.2} ms", ms)
    } else {
        format!("{:.2} s", ms / 1_000.0)
    }
}

/// Format a signed byte count with an explicit sign and binary unit
pub fn format_signed_bytes(bytes: i64) -> String {
    let sign = if bytes < 0 { "-" } else { "+" };
    let magnitude = bytes.unsigned_abs() as f64;
    if magnitude < 1024.0 {
        format!("{}{} B", sign, bytes.unsigned_abs())
    } else if magnitude < 1024.0 * 1024.0 {
        format!("{}{:.1} KiB", sign, magnitude / 1024.0)
    } else if magnitude < 1024.0 * 1024.0 * 1024.0 {
        format!("{}{:.1} MiB", sign, magnitude / (1024.0 * 1024.0))
    } else {
        format!("{}{:.1} GiB", sign, magnitude / (1024.0 * 1024.0 * 1024.0))
    }
}
