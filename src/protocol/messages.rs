//! JSON requests and tolerant response decoding
//!
//! Pods are loosely typed: extra fields are ignored, non-string cube names are
//! dropped and missing position axes read as zero.

use crate::{DiscoverError, Result};
use discover_common::{PlanetRecord, PodTarget, Vec3};
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field of the cube list response holding the names
pub const CUBES_FIELD: &str = "cubes";

/// Substring a pod includes in its reply to a correct secret
pub const AUTH_SUCCESS: &str = "auth_success";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    GetCubeList,
    GetPlanets,
}

impl Request {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn is_auth_success(reply: &str) -> bool {
    reply.contains(AUTH_SUCCESS)
}

/// Decode a cube list reply
///
/// The reply must be a JSON object (or `null`). A missing or non-list `cubes`
/// field gives an empty list.
pub fn decode_cube_list(raw: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Object(mut fields) => Ok(match fields.remove(CUBES_FIELD) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }),
        Value::Null => Ok(Vec::new()),
        other => Err(DiscoverError::Decode(format!(
            "cube list reply is not an object: {}",
            json_kind(&other)
        ))),
    }
}

/// Planet as a pod serializes it; only the fields the scanner keeps
///
/// Field names match case-insensitively, so `Name`, `name` and `NAME` are the
/// same field. A `null` field keeps its zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WirePlanet {
    pub name: String,
    pub position: WirePosition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WirePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl WirePlanet {
    pub fn coordinates(&self) -> Vec3 {
        [self.position.x, self.position.y, self.position.z]
    }

    pub fn into_record(self, target: &PodTarget) -> PlanetRecord {
        PlanetRecord {
            coordinates: self.coordinates(),
            name: self.name,
            host: target.host.clone(),
            port: target.port,
        }
    }
}

impl<'de> Deserialize<'de> for WirePlanet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PlanetVisitor;

        impl<'de> Visitor<'de> for PlanetVisitor {
            type Value = WirePlanet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a planet object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<WirePlanet, A::Error> {
                let mut planet = WirePlanet::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key.eq_ignore_ascii_case("name") {
                        if let Some(name) = map.next_value::<Option<String>>()? {
                            planet.name = name;
                        }
                    } else if key.eq_ignore_ascii_case("position") {
                        if let Some(position) = map.next_value::<Option<WirePosition>>()? {
                            planet.position = position;
                        }
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(planet)
            }
        }

        deserializer.deserialize_map(PlanetVisitor)
    }
}

impl<'de> Deserialize<'de> for WirePosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PositionVisitor;

        impl<'de> Visitor<'de> for PositionVisitor {
            type Value = WirePosition;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a position object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<WirePosition, A::Error> {
                let mut position = WirePosition::default();
                while let Some(key) = map.next_key::<String>()? {
                    let axis = if key.eq_ignore_ascii_case("x") {
                        &mut position.x
                    } else if key.eq_ignore_ascii_case("y") {
                        &mut position.y
                    } else if key.eq_ignore_ascii_case("z") {
                        &mut position.z
                    } else {
                        map.next_value::<IgnoredAny>()?;
                        continue;
                    };
                    if let Some(value) = map.next_value::<Option<f64>>()? {
                        *axis = value;
                    }
                }
                Ok(position)
            }
        }

        deserializer.deserialize_map(PositionVisitor)
    }
}

/// Decode a planet reply: group key -> list of planets
///
/// Group keys are discarded; planets come back in group key order, then in
/// list order within each group.
pub fn decode_planets(raw: &str, target: &PodTarget) -> Result<Vec<PlanetRecord>> {
    let groups: Option<BTreeMap<String, Option<Vec<Option<WirePlanet>>>>> =
        serde_json::from_str(raw)?;

    Ok(groups
        .unwrap_or_default()
        .into_values()
        .flatten()
        .flatten()
        .map(|planet| planet.unwrap_or_default().into_record(target))
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
