//! Scan configuration
//!
//! A `Config` is assembled by the entry point, either from a YAML file, from
//! command line flags, or from both layered together. The scanner itself
//! applies no defaults: every field must be supplied by the caller.

use crate::{DiscoverError, Result};
use discover_common::PodTarget;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete, validated scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Hosts to scan, in order
    pub hosts: Vec<String>,
    /// Port of pod index 0 on every host
    pub start_port: u16,
    /// Port increment between consecutive pod indices
    pub port_step: u16,
    /// Pods per host
    pub num_pods: usize,
    /// Shared secret sent as the first message
    pub auth_secret: String,
    /// End-of-message marker, treated as opaque bytes
    pub delimiter: String,
    /// Bound applied independently to connect, each write and each read
    pub timeout_secs: u64,
    /// Upper bound on simultaneous pod scans; `None` scans everything at once
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(DiscoverError::Config("delimiter must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(DiscoverError::Config(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if self.max_concurrency == Some(0) {
            return Err(DiscoverError::Config(
                "max_concurrency must be greater than zero when set".into(),
            ));
        }
        if self.num_pods > 0 && self.port_for(self.num_pods - 1).is_none() {
            return Err(DiscoverError::Config(format!(
                "pod index {} on start port {} with step {} exceeds port 65535",
                self.num_pods - 1,
                self.start_port,
                self.port_step
            )));
        }
        Ok(())
    }

    /// Port of the pod at `index`, or `None` if it falls outside the port range
    pub fn port_for(&self, index: usize) -> Option<u16> {
        let offset = index.checked_mul(self.port_step as usize)?;
        let port = (self.start_port as usize).checked_add(offset)?;
        u16::try_from(port).ok()
    }

    /// Every (host, port) pair of a scan pass: hosts in order, pod indices within each host
    pub fn targets(&self) -> Vec<PodTarget> {
        self.hosts
            .iter()
            .flat_map(|host| {
                (0..self.num_pods)
                    .filter_map(move |i| self.port_for(i).map(|port| PodTarget::new(host, port)))
            })
            .collect()
    }

    /// Number of pod results a scan pass records
    pub fn expected_results(&self) -> usize {
        self.hosts.len() * self.num_pods
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration with every field optional, used while layering sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialConfig {
    #[serde(default)]
    pub hosts: Option<Vec<String>>,
    #[serde(default)]
    pub start_port: Option<u16>,
    #[serde(default)]
    pub port_step: Option<u16>,
    #[serde(default)]
    pub num_pods: Option<usize>,
    #[serde(default)]
    pub auth_secret: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl PartialConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Overlay `other` on top of `self`; fields set in `other` win
    pub fn merge(self, other: PartialConfig) -> Self {
        Self {
            hosts: other.hosts.filter(|h| !h.is_empty()).or(self.hosts),
            start_port: other.start_port.or(self.start_port),
            port_step: other.port_step.or(self.port_step),
            num_pods: other.num_pods.or(self.num_pods),
            auth_secret: other.auth_secret.or(self.auth_secret),
            delimiter: other.delimiter.or(self.delimiter),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            max_concurrency: other.max_concurrency.or(self.max_concurrency),
        }
    }

    pub fn into_config(self) -> Result<Config> {
        let config = Config {
            hosts: required(self.hosts, "hosts")?,
            start_port: required(self.start_port, "start_port")?,
            port_step: required(self.port_step, "port_step")?,
            num_pods: required(self.num_pods, "num_pods")?,
            auth_secret: required(self.auth_secret, "auth_secret")?,
            delimiter: required(self.delimiter, "delimiter")?,
            timeout_secs: required(self.timeout_secs, "timeout_secs")?,
            max_concurrency: self.max_concurrency,
        };
        config.validate()?;
        Ok(config)
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| DiscoverError::Config(format!("missing {}", field)))
}
