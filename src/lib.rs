pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod pod;
pub mod protocol;
pub mod registry;
pub mod report;
pub mod scan;

pub use config::Config;
pub use discover_common::{PlanetRecord, PodResult, PodTarget, Vec3};
pub use error::{DiscoverError, PodError, Result};
pub use pod::{scan_pod, PodClient, PodScanner};
pub use registry::{Registry, RegistrySnapshot};
pub use scan::{scan_all, ScanReport, Scanner};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
