#![warn(missing_docs)]
//! FluxProbe CLI Library
//!
//! Command-line front end for the fluxprobe harnesses. It runs one of the
//! built-in workloads through the timing, heap snapshot and reclamation
//! report harnesses and prints the result as text or JSON.
//!
//! # Example
//!
//! ```ignore
//! use fluxprobe::TrackingAllocator;
//!
//! #[global_allocator]
//! static GLOBAL: TrackingAllocator = TrackingAllocator;
//!
//! fn main() {
//!     fluxprobe_cli::run().unwrap();
//! }
//! ```

mod config;
mod output;
mod runner;
mod workloads;

pub use config::*;
pub use output::{
    OutputFormat, ProbeReport, ReportMeta, format_human_output, format_ms, format_signed_bytes,
    generate_json_report,
};
pub use runner::{Harnesses, RunPlan, execute};
pub use workloads::Workload;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

/// FluxProbe CLI arguments
#[derive(Parser, Debug)]
#[command(name = "fluxprobe")]
#[command(author, version, about = "FluxProbe - micro-benchmarking harnesses")]
pub struct Cli {
    /// Optional subcommand; defaults to All
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Workload to profile (see `fluxprobe list`)
    #[arg(short, long, global = true)]
    pub workload: Option<String>,

    /// Size argument handed to each invocation
    #[arg(long, global = true)]
    pub size: Option<u64>,

    /// Iterations for every selected harness
    #[arg(short = 'n', long, global = true)]
    pub iterations: Option<usize>,

    /// Untimed warmup iterations for the timing harness
    #[arg(long, global = true)]
    pub warmup: Option<usize>,

    /// Settle delay before the collector report is taken (e.g., "1ms", "3s")
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Output format: human, json
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Pin the measuring thread to this CPU
    #[arg(long, global = true)]
    pub pin_cpu: Option<usize>,

    /// Configuration file (default: discover fluxprobe.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run every harness (default)
    All,
    /// Timing harness only
    Perf,
    /// Heap snapshot harness only
    Heap,
    /// Reclamation report harness only
    Gc,
    /// List the built-in workloads
    List,
    /// Write a default fluxprobe.toml into the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the FluxProbe CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the FluxProbe CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        "fluxprobe=debug,fluxprobe_core=debug,fluxprobe_cli=debug"
    } else {
        "fluxprobe=info,fluxprobe_core=info,fluxprobe_cli=info"
    };
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let command = cli.command.clone().unwrap_or(Commands::All);
    let harnesses = match command {
        Commands::List => return list_workloads(),
        Commands::Init { force } => return init_config(Path::new(CONFIG_FILE_NAME), force),
        Commands::All => Harnesses::ALL,
        Commands::Perf => Harnesses::TIMING,
        Commands::Heap => Harnesses::HEAP,
        Commands::Gc => Harnesses::GC,
    };

    let config = match &cli.config {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::discover().unwrap_or_default(),
    };

    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(config.output.format.as_str())
        .parse()
        .map_err(anyhow::Error::msg)?;

    let plan = build_plan(&cli, &config, harnesses)?;
    tracing::debug!(?plan, "resolved run plan");

    let report = execute(&plan)?;
    let rendered = match format {
        OutputFormat::Human => format_human_output(&report),
        OutputFormat::Json => generate_json_report(&report)?,
    };

    write_output(&rendered, cli.output.as_deref())
}

/// Layer command-line overrides on top of the configuration file.
pub fn build_plan(
    cli: &Cli,
    config: &ProbeConfig,
    harnesses: Harnesses,
) -> anyhow::Result<RunPlan> {
    let workload: Workload = cli
        .workload
        .as_deref()
        .unwrap_or(config.runner.workload.as_str())
        .parse()
        .map_err(anyhow::Error::msg)?;

    let mut perf = config.perf_options();
    let mut mem = config.mem_options();
    let mut gc = config.gc_options()?;

    if let Some(n) = cli.iterations {
        perf = perf.with_iterations(n);
        mem = mem.with_iterations(n);
        gc = gc.with_iterations(n);
    }
    if let Some(warmup) = cli.warmup {
        perf = perf.with_warmup(warmup);
    }
    if let Some(timeout) = &cli.timeout {
        gc = gc.with_timeout(ProbeConfig::parse_duration(timeout)?);
    }

    Ok(RunPlan {
        workload,
        size: cli.size.unwrap_or_else(|| workload.default_size()),
        harnesses,
        perf,
        mem,
        gc,
        heap_limit: config.heap.limit,
        pin_cpu: cli.pin_cpu.or(config.runner.pin_cpu),
    })
}

fn list_workloads() -> anyhow::Result<()> {
    println!("FluxProbe workloads:");
    for workload in Workload::ALL {
        let mode = if workload.is_async() { " [async]" } else { "" };
        println!(
            "├── {}{}: {}",
            workload.name(),
            mode,
            workload.description()
        );
    }
    println!("{} workloads available.", Workload::ALL.len());
    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, ProbeConfig::default_toml())
        .with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

fn write_output(rendered: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Report written to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
