//! Parser für GeoJSON-FeatureCollections.

use super::{
    Feature, FeatureCollection, FeatureProperties, Geometry, NODE_FEATURE_TYPE, WAY_FEATURE_TYPE,
};
use crate::core::{
    FeatureStore, GraphError, LatLng, NodeOptions, TagMap, TagSchema, TagValue, TagValueType,
};
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;

/// Zusammenfassung eines Imports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Angelegte Nodes
    pub nodes: usize,
    /// Angelegte Ways
    pub ways: usize,
    /// Ways, die wegen fehlender Nodes oder zu kurzer Node-Liste übersprungen wurden
    pub skipped_ways: Vec<i64>,
    /// Features mit unbekannter Geometrie oder unbekanntem `properties.type`
    pub ignored_features: usize,
}

/// Parsed eine GeoJSON-FeatureCollection in einen neuen FeatureStore.
///
/// Nodes werden vor Ways angelegt, damit die Reihenfolge der Features keine
/// Rolle spielt. Doppelte IDs brechen den Import ab.
pub fn parse_geojson(text: &str, schema: &TagSchema) -> Result<(FeatureStore, ImportReport)> {
    let collection: FeatureCollection =
        serde_json::from_str(text).context("Fehler beim Parsen des GeoJSON")?;
    if collection.kind != "FeatureCollection" {
        bail!(
            "GeoJSON-Wurzel muss eine FeatureCollection sein, gefunden: {}",
            collection.kind
        );
    }

    let mut store = FeatureStore::new();
    let mut report = ImportReport::default();
    let mut way_features = Vec::new();

    for (index, feature) in collection.features.iter().enumerate() {
        match &feature.geometry {
            Geometry::Point { coordinates } => {
                let Some(props) = feature_properties(feature, index, NODE_FEATURE_TYPE)? else {
                    report.ignored_features += 1;
                    continue;
                };
                let position = parse_position(coordinates)
                    .with_context(|| format!("Ungültige Position für Node {}", props.id))?;
                let tags = parse_tags(&props.tags, schema)
                    .with_context(|| format!("Ungültige Tags an Node {}", props.id))?;
                let options = NodeOptions {
                    visible: props.visible.unwrap_or(true),
                    ..NodeOptions::default()
                };
                store
                    .create_node(props.id, position, Some(options), Some(tags))
                    .with_context(|| format!("Node {} nicht importierbar", props.id))?;
                report.nodes += 1;
            }
            Geometry::LineString { .. } => {
                match feature_properties(feature, index, WAY_FEATURE_TYPE)? {
                    Some(props) => way_features.push(props),
                    None => report.ignored_features += 1,
                }
            }
            Geometry::Unsupported => {
                log::warn!("Feature #{} mit nicht unterstützter Geometrie ignoriert", index);
                report.ignored_features += 1;
            }
        }
    }

    for props in way_features {
        let tags = parse_tags(&props.tags, schema)
            .with_context(|| format!("Ungültige Tags an Way {}", props.id))?;
        match store.create_way(props.id, &props.nodes, Some(tags), props.visible) {
            Ok(_) => report.ways += 1,
            Err(err @ (GraphError::NotExists { .. } | GraphError::InvalidGraph(_))) => {
                log::warn!("Way {} übersprungen: {}", props.id, err);
                report.skipped_ways.push(props.id);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Way {} nicht importierbar", props.id));
            }
        }
    }

    store.ensure_spatial_index();
    Ok((store, report))
}

/// Liest die Properties eines Features; `None` wenn `type` nicht passt.
fn feature_properties(
    feature: &Feature,
    index: usize,
    expected_kind: &str,
) -> Result<Option<FeatureProperties>> {
    if feature.kind != "Feature" {
        bail!("Eintrag #{} ist kein Feature: {}", index, feature.kind);
    }
    let props: FeatureProperties = serde_json::from_value(feature.properties.clone())
        .with_context(|| format!("Ungültige Properties in Feature #{}", index))?;
    if props.kind != expected_kind {
        log::warn!(
            "Feature #{} (ID {}) ignoriert: type '{}' passt nicht zur Geometrie",
            index,
            props.id,
            props.kind
        );
        return Ok(None);
    }
    Ok(Some(props))
}

fn parse_position(coordinates: &[f64]) -> Result<LatLng> {
    let [lng, lat, ..] = coordinates else {
        bail!("Position braucht mindestens [lng, lat]");
    };
    Ok(LatLng::try_new(*lat, *lng)?)
}

/// Wandelt JSON-Tag-Werte anhand des Schemas in eine normalisierte `TagMap`.
fn parse_tags(raw: &BTreeMap<String, serde_json::Value>, schema: &TagSchema) -> Result<TagMap> {
    let mut parsed = TagMap::new();
    for (key, value) in raw {
        let Some(value) = json_to_tag_value(value) else {
            log::warn!("Tag '{}' mit nicht unterstütztem Wert ignoriert", key);
            continue;
        };
        let value = match (schema.value_type(key), value) {
            (TagValueType::Scalar, TagValue::List(mut values)) => {
                if values.len() > 1 {
                    bail!("Skalarer Tag '{}' trägt {} Werte", key, values.len());
                }
                match values.pop() {
                    Some(single) => TagValue::Text(single),
                    None => continue,
                }
            }
            (_, value) => value,
        };
        parsed.insert(key.clone(), value);
    }
    // Normalisiert CSV-Werte und prüft die Obergrenzen
    Ok(schema.merge_tags(&TagMap::new(), &parsed)?)
}

fn json_to_tag_value(value: &serde_json::Value) -> Option<TagValue> {
    match value {
        serde_json::Value::String(text) => Some(TagValue::Text(text.clone())),
        serde_json::Value::Number(number) => number.as_f64().map(TagValue::Number),
        serde_json::Value::Bool(flag) => Some(TagValue::Text(flag.to_string())),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(text) => Some(text.clone()),
                serde_json::Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(TagValue::List),
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
    }
}
