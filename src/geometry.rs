//! Spawn placement helpers over discovered planets
//!
//! Everything here is a pure function of a [`RegistrySnapshot`] and plain
//! coordinates; nothing touches the network.

use crate::registry::RegistrySnapshot;
use crate::{DiscoverError, Result};
use discover_common::Vec3;
use std::f64::consts::PI;

/// `n` points spread evenly over a sphere of `radius` around `center`
///
/// Uses a golden-angle spiral running from the top (`+y`) to the bottom of the
/// sphere. A single point is placed at `center + (radius, 0, 0)`.
pub fn fibonacci_sphere(n: usize, radius: f64, center: Vec3) -> Vec<Vec3> {
    match n {
        0 => Vec::new(),
        1 => vec![[center[0] + radius, center[1], center[2]]],
        _ => {
            let golden_angle = PI * (3.0 - 5f64.sqrt());
            (0..n)
                .map(|i| {
                    let y = 1.0 - (i as f64 / (n - 1) as f64) * 2.0;
                    let r = (1.0 - y * y).sqrt();
                    let theta = golden_angle * i as f64;
                    [
                        center[0] + theta.cos() * r * radius,
                        center[1] + y * radius,
                        center[2] + theta.sin() * r * radius,
                    ]
                })
                .collect()
        }
    }
}

/// Heading in degrees, in the x/z plane, that faces away from `center`
pub fn rotation_outward(center: Vec3, position: Vec3) -> f64 {
    let dx = position[0] - center[0];
    let dz = position[2] - center[2];
    dz.atan2(dx).to_degrees()
}

/// Unit vector from `center` towards `point`; `(0, 1, 0)` when they coincide
pub fn outward_normal(center: Vec3, point: Vec3) -> Vec3 {
    let v = [
        point[0] - center[0],
        point[1] - center[1],
        point[2] - center[2],
    ];
    let magnitude = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if magnitude == 0.0 {
        return [0.0, 1.0, 0.0];
    }
    [v[0] / magnitude, v[1] / magnitude, v[2] / magnitude]
}

pub fn distance(a: Vec3, b: Vec3) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Unit identifier such as `[SCOUT]-GE-gen2-v1` for role "scout", domain "galaxy.example"
pub fn unit_id(role: &str, domain: &str, generation: u32, version: u32) -> String {
    let project_code: String = domain
        .split('.')
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    format!(
        "[{}]-{}-gen{}-v{}",
        role.to_uppercase(),
        project_code,
        generation,
        version
    )
}

impl RegistrySnapshot {
    /// Coordinates of every known planet
    pub fn planet_centers(&self) -> Vec<Vec3> {
        self.planets.values().map(|p| p.coordinates).collect()
    }

    /// Spawn points on a sphere around the named planet
    pub fn spawn_positions(&self, planet: &str, n: usize, radius: f64) -> Result<Vec<Vec3>> {
        let record = self
            .planet(planet)
            .ok_or_else(|| DiscoverError::PlanetNotFound {
                name: planet.to_string(),
            })?;
        Ok(fibonacci_sphere(n, radius, record.coordinates))
    }

    /// Nearest planet to `point` with its distance; `None` when no planets are known
    pub fn closest_planet(&self, point: Vec3) -> Option<(&str, f64)> {
        self.planets
            .iter()
            .map(|(name, p)| (name.as_str(), distance(p.coordinates, point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// True when every known planet is at least `min_distance` from `point`
    pub fn is_spawn_point_free(&self, point: Vec3, min_distance: f64) -> bool {
        self.planets
            .values()
            .all(|p| distance(p.coordinates, point) >= min_distance)
    }
}
