//! Writer für GeoJSON-FeatureCollections.

use super::{
    Feature, FeatureCollection, FeatureProperties, Geometry, NODE_FEATURE_TYPE, WAY_FEATURE_TYPE,
};
use crate::core::{FeatureStore, LatLng, TagMap, TagValue};
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// Schreibt den Store als GeoJSON-FeatureCollection.
///
/// Erst alle Nodes, dann alle Ways, jeweils nach ID sortiert. CSV-Listen
/// werden als kommagetrennter Text geschrieben, wie sie importiert werden.
pub fn write_geojson(store: &FeatureStore) -> Result<String> {
    let mut features = Vec::with_capacity(store.node_count() + store.way_count());

    for id in store.node_ids() {
        let node = store.get_node(id)?;
        features.push(Feature {
            kind: "Feature".to_string(),
            geometry: Geometry::Point {
                coordinates: position_to_coordinates(node.position),
            },
            properties: properties_value(FeatureProperties {
                id,
                kind: NODE_FEATURE_TYPE.to_string(),
                nodes: Vec::new(),
                tags: tags_to_json(&node.tags),
                visible: (!node.visible).then_some(false),
            })?,
        });
    }

    for id in store.way_ids() {
        let way = store.get_way(id)?;
        let coordinates = store
            .way_coordinates(id)?
            .into_iter()
            .map(position_to_coordinates)
            .collect();
        features.push(Feature {
            kind: "Feature".to_string(),
            geometry: Geometry::LineString { coordinates },
            properties: properties_value(FeatureProperties {
                id,
                kind: WAY_FEATURE_TYPE.to_string(),
                nodes: way.node_ids.clone(),
                tags: tags_to_json(&way.tags),
                visible: (!way.visible).then_some(false),
            })?,
        });
    }

    let collection = FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features,
    };
    serde_json::to_string_pretty(&collection).context("GeoJSON-Serialisierung fehlgeschlagen")
}

fn position_to_coordinates(position: LatLng) -> Vec<f64> {
    vec![position.lng, position.lat]
}

fn properties_value(props: FeatureProperties) -> Result<serde_json::Value> {
    serde_json::to_value(&props)
        .with_context(|| format!("Properties von Feature {} nicht serialisierbar", props.id))
}

fn tags_to_json(tags: &TagMap) -> BTreeMap<String, serde_json::Value> {
    tags.iter()
        .map(|(key, value)| {
            let json = match value {
                TagValue::Number(number) => serde_json::Number::from_f64(*number)
                    .map(serde_json::Value::Number)
                    .unwrap_or_else(|| serde_json::Value::String(number.to_string())),
                other => serde_json::Value::String(other.as_text()),
            };
            (key.clone(), json)
        })
        .collect()
}
