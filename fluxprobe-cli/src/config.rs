//! Configuration loading from fluxprobe.toml
//!
//! FluxProbe configuration can be specified in a `fluxprobe.toml` file in the
//! project root. The file is discovered by walking up from the current
//! directory; command-line flags override whatever it sets.

use fluxprobe_core::{GcProfilerOptions, MemOptions, PerfOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the discovered configuration file
pub const CONFIG_FILE_NAME: &str = "fluxprobe.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A duration string could not be parsed
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
    /// A duration string used an unknown unit
    #[error("unknown duration unit {0:?}")]
    UnknownUnit(String),
}

/// FluxProbe configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProbeConfig {
    /// Timing harness defaults
    #[serde(default)]
    pub timing: TimingConfig,
    /// Heap snapshot harness defaults
    #[serde(default)]
    pub heap: HeapConfig,
    /// Reclamation report harness defaults
    #[serde(default)]
    pub gc: GcConfig,
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Timing harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Measured iterations
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Unmeasured warmup iterations
    #[serde(default)]
    pub warmup: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            warmup: 0,
        }
    }
}

/// Heap snapshot harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapConfig {
    /// Invocations between the two snapshots
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Heap size limit to report, in bytes (None = unlimited)
    #[serde(default)]
    pub limit: Option<u64>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            limit: None,
        }
    }
}

/// Reclamation report harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    /// Invocations while the recorder runs
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Settle delay before the recorder is stopped (e.g., "1ms", "3s")
    #[serde(default = "default_gc_timeout")]
    pub timeout: String,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            timeout: default_gc_timeout(),
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Built-in workload to profile
    #[serde(default = "default_workload")]
    pub workload: String,
    /// Pin the measuring thread to this CPU
    #[serde(default)]
    pub pin_cpu: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workload: default_workload(),
            pin_cpu: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_iterations() -> usize {
    fluxprobe_core::DEFAULT_ITERATIONS
}
fn default_gc_timeout() -> String {
    "1ms".to_string()
}
fn default_workload() -> String {
    "fill-array".to_string()
}
fn default_format() -> String {
    "human".to_string()
}

impl ProbeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!(path = %config_path.display(), "loaded configuration");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), "ignoring configuration: {e}");
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Timing options from the `[timing]` section
    pub fn perf_options(&self) -> PerfOptions {
        PerfOptions::default()
            .with_iterations(self.timing.iterations)
            .with_warmup(self.timing.warmup)
    }

    /// Heap options from the `[heap]` section
    pub fn mem_options(&self) -> MemOptions {
        MemOptions::default().with_iterations(self.heap.iterations)
    }

    /// Collector options from the `[gc]` section
    pub fn gc_options(&self) -> Result<GcProfilerOptions, ConfigError> {
        Ok(GcProfilerOptions::default()
            .with_iterations(self.gc.iterations)
            .with_timeout(Self::parse_duration(&self.gc.timeout)?))
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# FluxProbe Configuration

[timing]
# Measured iterations
iterations = 1
# Unmeasured warmup iterations
warmup = 0

[heap]
# Invocations between the before/after snapshots
iterations = 1
# Heap size limit to report in bytes (uncomment to enable)
# limit = 1073741824

[gc]
# Invocations while the recorder runs
iterations = 1
# Settle delay before the recorder is stopped
timeout = "1ms"

[runner]
# Workload: fill-array, sum, churn, sleep
workload = "fill-array"
# Pin the measuring thread to a CPU (uncomment to enable)
# pin_cpu = 0

[output]
# Output format: human, json
format = "human"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::InvalidDuration(s.to_string()));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "ms"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidDuration(s.to_string()));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(ConfigError::UnknownUnit(unit_part.to_string())),
        };

        Ok(Duration::from_nanos((value * multiplier as f64) as u64))
    }
}
