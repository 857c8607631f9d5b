//! Configuration resolution for classflow-import
//!
//! Each field resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `CLASSFLOW_*` environment variable
//! 3. TOML config file (`classflow.toml`)
//! 4. Compiled default (fallback)

use classflow_common::{Error, Result};
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5810";
const DEFAULT_STEP_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RETENTION_SECS: u64 = 900;
const DEFAULT_BUS_CAPACITY: usize = 256;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Command-line flags for the import service
#[derive(Debug, Parser, Default)]
#[command(name = "classflow-import", about = "ClassFlow import pipeline service")]
pub struct CliArgs {
    /// Socket address to bind the HTTP server on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Per-step collaborator timeout in seconds
    #[arg(long)]
    pub step_timeout: Option<u64>,

    /// Seconds to retain finished jobs before eviction
    #[arg(long)]
    pub retention: Option<u64>,

    /// Directory uploads are spooled to
    #[arg(long)]
    pub spool_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// TOML config file shape
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    step_timeout_secs: Option<u64>,
    retention_secs: Option<u64>,
    bus_capacity: Option<usize>,
    max_upload_bytes: Option<usize>,
    spool_dir: Option<PathBuf>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub bind_addr: SocketAddr,
    pub step_timeout: Duration,
    pub retention: Duration,
    pub bus_capacity: usize,
    pub max_upload_bytes: usize,
    pub spool_dir: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("valid default bind addr"),
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            spool_dir: std::env::temp_dir().join("classflow-import"),
        }
    }
}

impl ImportConfig {
    /// Resolve configuration from CLI args, environment, and config file
    pub fn resolve(args: &CliArgs) -> Result<Self> {
        let file = load_file_config(args.config.as_deref())?;
        let defaults = Self::default();

        let bind_addr = args
            .bind
            .or_else(|| parse_env("CLASSFLOW_BIND"))
            .or(file.bind)
            .unwrap_or(defaults.bind_addr);

        let step_timeout = args
            .step_timeout
            .or_else(|| parse_env("CLASSFLOW_STEP_TIMEOUT_SECS"))
            .or(file.step_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.step_timeout);

        let retention = args
            .retention
            .or_else(|| parse_env("CLASSFLOW_RETENTION_SECS"))
            .or(file.retention_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.retention);

        let bus_capacity = parse_env("CLASSFLOW_BUS_CAPACITY")
            .or(file.bus_capacity)
            .unwrap_or(defaults.bus_capacity);

        let max_upload_bytes = parse_env("CLASSFLOW_MAX_UPLOAD_BYTES")
            .or(file.max_upload_bytes)
            .unwrap_or(defaults.max_upload_bytes);

        let spool_dir = args
            .spool_dir
            .clone()
            .or_else(|| std::env::var("CLASSFLOW_SPOOL_DIR").ok().map(PathBuf::from))
            .or(file.spool_dir)
            .unwrap_or(defaults.spool_dir);

        let config = Self {
            bind_addr,
            step_timeout,
            retention,
            bus_capacity,
            max_upload_bytes,
            spool_dir,
        };
        info!(?config, "resolved import service configuration");
        Ok(config)
    }
}

fn load_file_config(path: Option<&std::path::Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("invalid config file: {e}")))
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
