pub mod commands;

use crate::config::PartialConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "discover")]
#[command(author = "Ignoramuss")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover planets and cubes across a fleet of simulation pods", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Scan every pod once and print a summary")]
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(long, help = "Write Prometheus metrics for the pass to this file")]
        metrics_out: Option<PathBuf>,
    },
    #[command(about = "Scan, then export the discovered planets")]
    Planets {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short, long, default_value = "table", help = "Output format (table, json, yaml)")]
        format: String,

        #[arg(short, long, help = "Output file path")]
        output: Option<PathBuf>,
    },
    #[command(about = "Scan, then compute spawn points around a planet")]
    Spawn {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(long, help = "Planet to spawn around")]
        planet: String,

        #[arg(long, help = "Number of spawn points")]
        count: usize,

        #[arg(long, help = "Distance of spawn points from the planet center")]
        radius: f64,

        #[arg(long, help = "Minimum clearance from every planet for a point to count as free")]
        min_distance: Option<f64>,
    },
    #[command(about = "Scan, then find the planet nearest to a point")]
    Closest {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(
            long,
            value_delimiter = ',',
            allow_negative_numbers = true,
            help = "Point as X,Y,Z"
        )]
        point: Vec<f64>,
    },
}

/// Where the scan configuration comes from; flags override the file
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    #[arg(short, long, help = "YAML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long = "host", help = "Host to scan (repeatable)")]
    pub hosts: Vec<String>,

    #[arg(long, help = "Port of the first pod on each host")]
    pub start_port: Option<u16>,

    #[arg(long, help = "Port increment between pods")]
    pub port_step: Option<u16>,

    #[arg(long, help = "Pods per host")]
    pub num_pods: Option<usize>,

    #[arg(long, env = "DISCOVER_AUTH_SECRET", hide_env_values = true, help = "Shared pod secret")]
    pub auth_secret: Option<String>,

    #[arg(long, help = "Message delimiter")]
    pub delimiter: Option<String>,

    #[arg(long = "timeout", help = "Per-operation timeout in seconds")]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Maximum simultaneous pod scans (unbounded if unset)")]
    pub max_concurrency: Option<usize>,
}

impl ScanArgs {
    pub fn overrides(&self) -> PartialConfig {
        PartialConfig {
            hosts: (!self.hosts.is_empty()).then(|| self.hosts.clone()),
            start_port: self.start_port,
            port_step: self.port_step,
            num_pods: self.num_pods,
            auth_secret: self.auth_secret.clone(),
            delimiter: self.delimiter.clone(),
            timeout_secs: self.timeout_secs,
            max_concurrency: self.max_concurrency,
        }
    }
}
