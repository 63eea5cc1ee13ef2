//! Shared types between the scanner and its consumers
//!
//! These are plain records produced by a scan pass:
//! - `PodTarget` names one pod endpoint
//! - `PlanetRecord` is a planet as reported by a pod, stamped with the pod address
//! - `PodResult` is the outcome of one pod attempt
//!
//! Serde derives are enabled by the default `serde` feature.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point or direction in simulation space: `[x, y, z]`
pub type Vec3 = [f64; 3];

/// One pod endpoint of a scan pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PodTarget {
    pub host: String,
    pub port: u16,
}

impl PodTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` form used for dialing
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for PodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A planet reported by a pod
///
/// `host` and `port` always name the pod that was scanned, never any
/// address embedded in the payload itself.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanetRecord {
    pub name: String,
    pub coordinates: Vec3,
    pub host: String,
    pub port: u16,
}

/// Outcome of scanning a single pod
///
/// `error` is `Some` exactly when `success` is false. A failed result carries
/// no cubes and no planets.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PodResult {
    pub host: String,
    pub port: u16,
    pub success: bool,
    pub error: Option<String>,
    pub cubes: Vec<String>,
    pub planets: Vec<PlanetRecord>,
}

impl PodResult {
    pub fn success(target: &PodTarget, cubes: Vec<String>, planets: Vec<PlanetRecord>) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            success: true,
            error: None,
            cubes,
            planets,
        }
    }

    pub fn failure(target: &PodTarget, error: impl Into<String>) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            success: false,
            error: Some(error.into()),
            cubes: Vec::new(),
            planets: Vec::new(),
        }
    }

    pub fn target(&self) -> PodTarget {
        PodTarget::new(self.host.clone(), self.port)
    }
}
