//! Human-readable and machine-readable views of a registry

use crate::registry::RegistrySnapshot;
use crate::{DiscoverError, Result};
use discover_common::PodResult;
use std::fmt;
use std::str::FromStr;

/// Outcome of one pod as shown in the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodLine {
    pub host: String,
    pub port: u16,
    pub outcome: PodOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodOutcome {
    Ok { cubes: usize, planets: usize },
    Failed(String),
}

/// Totals over every pod result of a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub pods: Vec<PodLine>,
    pub successful: usize,
    pub expected: usize,
    pub total_cubes: usize,
    pub total_planets: usize,
    pub unique_planets: usize,
}

impl ScanSummary {
    /// `expected` is the number of pods the configuration describes
    pub fn new(snapshot: &RegistrySnapshot, expected: usize) -> Self {
        let mut summary = Self::from_results(&snapshot.results, expected);
        summary.unique_planets = snapshot.planets.len();
        summary
    }

    pub fn from_results(results: &[PodResult], expected: usize) -> Self {
        let mut summary = Self {
            pods: Vec::with_capacity(results.len()),
            successful: 0,
            expected,
            total_cubes: 0,
            total_planets: 0,
            unique_planets: 0,
        };

        for result in results {
            let outcome = if result.success {
                summary.successful += 1;
                summary.total_cubes += result.cubes.len();
                summary.total_planets += result.planets.len();
                PodOutcome::Ok {
                    cubes: result.cubes.len(),
                    planets: result.planets.len(),
                }
            } else {
                PodOutcome::Failed(result.error.clone().unwrap_or_default())
            };
            summary.pods.push(PodLine {
                host: result.host.clone(),
                port: result.port,
                outcome,
            });
        }

        summary
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== D.I.S.C.O.V.E.R.™ SUMMARY ===")?;
        for pod in &self.pods {
            match &pod.outcome {
                PodOutcome::Ok { cubes, planets } => writeln!(
                    f,
                    "[{}:{}] ✅ Cubes={} Planets={}",
                    pod.host, pod.port, cubes, planets
                )?,
                PodOutcome::Failed(error) => {
                    writeln!(f, "[{}:{}] ❌ {}", pod.host, pod.port, error)?
                }
            }
        }
        writeln!(f)?;
        writeln!(f, "Successful pods: {} / {}", self.successful, self.expected)?;
        writeln!(f, "Total Cubes: {}", self.total_cubes)?;
        writeln!(f, "Total Planets: {}", self.total_planets)?;
        write!(f, "Unique Planets: {}", self.unique_planets)
    }
}

pub const TABLE_HEADER: [&str; 6] = ["Name", "X", "Y", "Z", "Host", "Port"];

/// Header row followed by one row per planet, sorted by name
pub fn planet_table(snapshot: &RegistrySnapshot) -> Vec<Vec<String>> {
    let mut table: Vec<Vec<String>> = vec![TABLE_HEADER.iter().map(|h| h.to_string()).collect()];
    table.extend(snapshot.planets.values().map(|p| {
        vec![
            p.name.clone(),
            format!("{:.3}", p.coordinates[0]),
            format!("{:.3}", p.coordinates[1]),
            format!("{:.3}", p.coordinates[2]),
            p.host.clone(),
            p.port.to_string(),
        ]
    }));
    table
}

/// Render rows as left-aligned columns
pub fn format_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Table,
    Json,
    Yaml,
}

impl FromStr for ExportFormat {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(ExportFormat::Table),
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(DiscoverError::Config(format!(
                "unknown export format '{}' (expected table, json or yaml)",
                other
            ))),
        }
    }
}

pub fn export(snapshot: &RegistrySnapshot, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Table => Ok(format_table(&planet_table(snapshot))),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
        ExportFormat::Yaml => Ok(serde_yaml::to_string(snapshot)?),
    }
}
