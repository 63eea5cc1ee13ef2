pub mod orchestrator;

pub use orchestrator::{scan_all, ScanReport, Scanner};
