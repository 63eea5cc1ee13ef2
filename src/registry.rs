//! Aggregated view of every pod scanned so far
//!
//! Planets are keyed by name and cubes by name; when two pods report the same
//! name, whichever result is merged last wins and no error is raised. Every
//! pod result, successful or not, is kept in arrival order for reporting.

use discover_common::{PlanetRecord, PodResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct RegistryState {
    planets: HashMap<String, PlanetRecord>,
    cubes: HashMap<String, String>,
    results: Vec<PodResult>,
}

/// Shared discovery registry
///
/// Cloning is cheap and every clone sees the same data. Writes happen only
/// through [`Registry::merge`], one result at a time.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    state: Arc<RwLock<RegistryState>>,
}

/// Owned copy of the registry at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    pub planets: BTreeMap<String, PlanetRecord>,
    pub cubes: BTreeMap<String, String>,
    pub results: Vec<PodResult>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one pod result
    ///
    /// The result is always appended to the log. Only a successful result
    /// touches the planet and cube maps.
    pub async fn merge(&self, result: PodResult) {
        let mut state = self.state.write().await;

        if result.success {
            for planet in &result.planets {
                if let Some(previous) = state.planets.insert(planet.name.clone(), planet.clone()) {
                    debug!(
                        planet = %planet.name,
                        "replacing planet from {}:{} with report from {}:{}",
                        previous.host,
                        previous.port,
                        planet.host,
                        planet.port
                    );
                }
            }
            for cube in &result.cubes {
                state.cubes.insert(cube.clone(), result.host.clone());
            }
        }

        state.results.push(result);
    }

    pub async fn planet(&self, name: &str) -> Option<PlanetRecord> {
        self.state.read().await.planets.get(name).cloned()
    }

    pub async fn planets(&self) -> Vec<PlanetRecord> {
        self.state.read().await.planets.values().cloned().collect()
    }

    /// Cube name to reporting host
    pub async fn cubes(&self) -> HashMap<String, String> {
        self.state.read().await.cubes.clone()
    }

    /// Every pod result merged so far, in merge order
    pub async fn results(&self) -> Vec<PodResult> {
        self.state.read().await.results.clone()
    }

    pub async fn planet_count(&self) -> usize {
        self.state.read().await.planets.len()
    }

    pub async fn cube_count(&self) -> usize {
        self.state.read().await.cubes.len()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read().await;
        RegistrySnapshot {
            planets: state
                .planets
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            cubes: state
                .cubes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            results: state.results.clone(),
        }
    }
}

impl RegistrySnapshot {
    pub fn planet(&self, name: &str) -> Option<&PlanetRecord> {
        self.planets.get(name)
    }

    pub fn successful_results(&self) -> impl Iterator<Item = &PodResult> {
        self.results.iter().filter(|r| r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discover_common::PodTarget;

    fn planet(name: &str, coordinates: [f64; 3], target: &PodTarget) -> PlanetRecord {
        PlanetRecord {
            name: name.to_string(),
            coordinates,
            host: target.host.clone(),
            port: target.port,
        }
    }

    #[tokio::test]
    async fn test_merge_success_populates_maps() {
        let registry = Registry::new();
        let target = PodTarget::new("host-a", 14000);

        registry
            .merge(PodResult::success(
                &target,
                vec!["cube-1".to_string(), "cube-2".to_string()],
                vec![planet("Terra", [1.0, 2.0, 3.0], &target)],
            ))
            .await;

        let terra = registry.planet("Terra").await.expect("Should find planet");
        assert_eq!(terra.coordinates, [1.0, 2.0, 3.0]);
        assert_eq!(registry.planets().await, vec![terra]);
        assert_eq!(registry.cube_count().await, 2);
        assert_eq!(registry.cubes().await["cube-1"], "host-a");
        assert_eq!(registry.results().await.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_failure_only_logs_result() {
        let registry = Registry::new();
        let target = PodTarget::new("host-b", 14003);

        registry
            .merge(PodResult::failure(&target, "Bad password"))
            .await;

        assert_eq!(registry.planet_count().await, 0);
        assert_eq!(registry.cube_count().await, 0);
        let results = registry.results().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error.as_deref(), Some("Bad password"));
    }

    #[tokio::test]
    async fn test_last_merge_wins() {
        let registry = Registry::new();
        let first = PodTarget::new("host-a", 1);
        let second = PodTarget::new("host-b", 2);

        registry
            .merge(PodResult::success(
                &first,
                vec!["shared".to_string()],
                vec![planet("P1", [1.0, 1.0, 1.0], &first)],
            ))
            .await;
        registry
            .merge(PodResult::success(
                &second,
                vec!["shared".to_string()],
                vec![planet("P1", [9.0, 9.0, 9.0], &second)],
            ))
            .await;

        let p1 = registry.planet("P1").await.unwrap();
        assert_eq!(p1.coordinates, [9.0, 9.0, 9.0]);
        assert_eq!(p1.host, "host-b");
        assert_eq!(registry.planet_count().await, 1);
        assert_eq!(registry.cubes().await["shared"], "host-b");
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let registry = Registry::new();
        let handle = registry.clone();

        handle
            .merge(PodResult::failure(&PodTarget::new("h", 1), "x"))
            .await;

        assert_eq!(registry.results().await.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted_and_detached() {
        let registry = Registry::new();
        let target = PodTarget::new("h", 1);
        registry
            .merge(PodResult::success(
                &target,
                vec![],
                vec![
                    planet("Zeta", [0.0; 3], &target),
                    planet("Alpha", [0.0; 3], &target),
                ],
            ))
            .await;

        let snapshot = registry.snapshot().await;
        registry
            .merge(PodResult::failure(&PodTarget::new("h", 2), "x"))
            .await;

        let names: Vec<&String> = snapshot.planets.keys().collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(snapshot.results.len(), 1);
        assert_eq!(snapshot.successful_results().count(), 1);
    }
}
