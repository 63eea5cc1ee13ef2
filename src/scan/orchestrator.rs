use crate::config::Config;
use crate::error::PodError;
use crate::metrics::ScanMetrics;
use crate::pod::{PodClient, PodScanner};
use crate::registry::Registry;
use crate::Result;
use discover_common::{PodResult, PodTarget};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// Counts for one scan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Fans a scan pass out over every configured pod and merges the results
pub struct Scanner {
    config: Config,
    scanner: Arc<dyn PodScanner>,
    registry: Registry,
    metrics: Option<ScanMetrics>,
}

impl Scanner {
    /// Scanner using the delimiter-framed TCP client described by `config`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = PodClient::from_config(&config)?;
        Self::with_scanner(config, Arc::new(client))
    }

    /// Scanner driving a caller-supplied pod client; `config` is validated
    pub fn with_scanner(config: Config, scanner: Arc<dyn PodScanner>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scanner,
            registry: Registry::new(),
            metrics: None,
        })
    }

    /// Merge into an existing registry instead of a fresh one
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one scan pass
    ///
    /// Every pod is scanned concurrently (bounded only when `max_concurrency`
    /// is set) and the call returns once every pod has reported. Exactly one
    /// result per (host, pod index) pair is merged into the registry.
    pub async fn scan_all(&self) -> ScanReport {
        let started = Instant::now();
        let targets = self.config.targets();

        info!(
            hosts = self.config.hosts.len(),
            pods = targets.len(),
            max_concurrency = ?self.config.max_concurrency,
            "Starting scan pass"
        );

        let mut pending: HashMap<PodTarget, usize> = HashMap::new();
        for target in &targets {
            *pending.entry(target.clone()).or_default() += 1;
        }

        // Sized so that no task ever waits to report
        let (tx, mut rx) = mpsc::channel::<PodResult>(targets.len().max(1));
        let limiter = self
            .config
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n)));

        for target in targets {
            let tx = tx.clone();
            let scanner = Arc::clone(&self.scanner);
            let limiter = limiter.clone();

            tokio::spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let result = scanner.scan(target).await;
                if tx.send(result).await.is_err() {
                    debug!("scan pass ended before result was delivered");
                }
            });
        }
        drop(tx);

        let mut report = ScanReport::default();

        while let Some(result) = rx.recv().await {
            let target = result.target();
            if let Some(count) = pending.get_mut(&target) {
                *count -= 1;
                if *count == 0 {
                    pending.remove(&target);
                }
            }
            self.record(result, &mut report).await;
        }

        // Tasks that died without reporting still get a result
        for (target, count) in pending {
            for _ in 0..count {
                warn!(pod = %target, "scan task ended without a result");
                self.record(
                    PodResult::failure(&target, PodError::Aborted.to_string()),
                    &mut report,
                )
                .await;
            }
        }

        report.elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_pass(
                report.elapsed,
                self.registry.planet_count().await,
                self.registry.cube_count().await,
            );
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Scan pass complete"
        );

        report
    }

    async fn record(&self, result: PodResult, report: &mut ScanReport) {
        report.attempted += 1;
        if result.success {
            report.succeeded += 1;
        } else {
            report.failed += 1;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_result(&result);
        }
        self.registry.merge(result).await;
    }
}

/// Scan every pod described by `config` into a fresh registry
pub async fn scan_all(config: Config) -> Result<Registry> {
    let scanner = Scanner::new(config)?;
    scanner.scan_all().await;
    Ok(scanner.registry().clone())
}
