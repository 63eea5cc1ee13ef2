//! Prometheus metrics for scan passes
//!
//! Metrics live in a private `prometheus::Registry` rather than the process
//! global one, so several scanners (and tests) can coexist.

use crate::Result;
use discover_common::PodResult;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Duration;

#[derive(Clone)]
pub struct ScanMetrics {
    registry: Registry,
    pods_scanned: IntCounterVec,
    planets_known: IntGauge,
    cubes_known: IntGauge,
    scan_duration: Histogram,
}

impl ScanMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let pods_scanned = IntCounterVec::new(
            Opts::new("discover_pods_scanned_total", "Pod scan attempts by outcome"),
            &["outcome"],
        )?;
        let planets_known = IntGauge::new(
            "discover_planets_known",
            "Unique planets in the registry",
        )?;
        let cubes_known = IntGauge::new("discover_cubes_known", "Unique cubes in the registry")?;
        let scan_duration = Histogram::with_opts(
            HistogramOpts::new(
                "discover_scan_duration_seconds",
                "Wall time of a full scan pass",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(pods_scanned.clone()))?;
        registry.register(Box::new(planets_known.clone()))?;
        registry.register(Box::new(cubes_known.clone()))?;
        registry.register(Box::new(scan_duration.clone()))?;

        Ok(Self {
            registry,
            pods_scanned,
            planets_known,
            cubes_known,
            scan_duration,
        })
    }

    pub fn record_result(&self, result: &PodResult) {
        let outcome = if result.success { "success" } else { "failure" };
        self.pods_scanned.with_label_values(&[outcome]).inc();
    }

    pub fn record_pass(&self, elapsed: Duration, planets: usize, cubes: usize) {
        self.scan_duration.observe(elapsed.as_secs_f64());
        self.planets_known.set(planets as i64);
        self.cubes_known.set(cubes as i64);
    }

    pub fn pods_scanned(&self, outcome: &str) -> u64 {
        self.pods_scanned.with_label_values(&[outcome]).get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
