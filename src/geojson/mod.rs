//! GeoJSON Import/Export für den Feature-Graphen.
//!
//! Erwartet wird eine `FeatureCollection`:
//! - `Point`-Features mit `properties = { id, type: "node", tags }`
//! - `LineString`-Features mit `properties = { id, type: "way", nodes, tags }`
//!
//! Koordinaten stehen in GeoJSON-Reihenfolge `[lng, lat]`. Für Ways sind die
//! Node-IDs in `nodes` maßgeblich, die Geometrie dient nur der Darstellung.

pub mod parser;
pub mod writer;

pub use parser::{parse_geojson, ImportReport};
pub use writer::write_geojson;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wert von `properties.type` für Nodes.
pub const NODE_FEATURE_TYPE: &str = "node";
/// Wert von `properties.type` für Ways.
pub const WAY_FEATURE_TYPE: &str = "way";

#[derive(Debug, Serialize, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
    geometry: Geometry,
    #[serde(default)]
    properties: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<Vec<f64>> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Serialize, Deserialize)]
struct FeatureProperties {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<i64>,
    #[serde(default)]
    tags: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visible: Option<bool>,
}
