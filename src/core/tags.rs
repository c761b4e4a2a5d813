//! Tag-Merge-Engine: Klassifizierungs-Tags auf Nodes und Ways.
//!
//! Jeder Tag-Schlüssel ist entweder skalar (genau ein Wert) oder CSV
//! (mehrere Werte bis `values_max_count`). Die Zuordnung kommt aus dem
//! extern konfigurierten [`TagSchema`]. Alle Operationen sind rein:
//! sie liefern eine neue `TagMap` und verändern die Eingabe nicht.

use super::{FeatureKind, GraphError, GraphResult};
use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Trennzeichen für CSV-kodierte Mehrfachwerte.
pub const CSV_SEPARATOR: char = ',';

/// Wert eines Tags.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Skalarer Text
    Text(String),
    /// Skalare Zahl
    Number(f64),
    /// Mehrfachwert eines CSV-Schlüssels
    List(Vec<String>),
}

impl TagValue {
    /// Alle Einzelwerte als Text (skalar → ein Element).
    pub fn values(&self) -> Vec<String> {
        match self {
            TagValue::List(values) => values.clone(),
            other => vec![other.as_text()],
        }
    }

    /// Textdarstellung; Listen werden CSV-kodiert.
    pub fn as_text(&self) -> String {
        match self {
            TagValue::Text(text) => text.clone(),
            TagValue::Number(number) => number.to_string(),
            TagValue::List(values) => values.join(&CSV_SEPARATOR.to_string()),
        }
    }

    /// Vergleicht zwei skalare Werte über ihre Textform (`1` == `"1"`).
    pub fn same_scalar(&self, other: &TagValue) -> bool {
        self.as_text() == other.as_text()
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Number(value)
    }
}

impl From<Vec<&str>> for TagValue {
    fn from(values: Vec<&str>) -> Self {
        TagValue::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Tags eines Features (deterministisch nach Schlüssel geordnet).
pub type TagMap = BTreeMap<String, TagValue>;

/// Zerlegt einen CSV-kodierten Text in Einzelwerte (leere Einträge entfallen).
pub fn split_csv(text: &str) -> Vec<String> {
    text.split(CSV_SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Werte-Typ eines Tag-Schlüssels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagValueType {
    /// Genau ein Wert
    #[default]
    Scalar,
    /// CSV-Liste mit mehreren Werten
    Csv,
}

/// Statische Metadaten eines Tag-Schlüssels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagKeyMeta {
    /// Skalar oder CSV
    #[serde(default)]
    pub value_type: TagValueType,
    /// Maximale Anzahl Werte (nur CSV, `None` = unbegrenzt)
    #[serde(default)]
    pub values_max_count: Option<usize>,
    /// Maximale Zeichenanzahl eines Einzelwerts
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Erlaubte Werte für Auswahlfelder (leer = frei)
    #[serde(default)]
    pub options: Vec<String>,
}

impl TagKeyMeta {
    /// Metadaten für einen skalaren Schlüssel.
    pub fn scalar() -> Self {
        Self::default()
    }

    /// Metadaten für einen CSV-Schlüssel mit Obergrenze.
    pub fn csv(values_max_count: usize) -> Self {
        Self {
            value_type: TagValueType::Csv,
            values_max_count: Some(values_max_count),
            ..Self::default()
        }
    }
}

/// Auswahl-Daten eines Schlüssels für die UI.
#[derive(Debug, Clone, PartialEq)]
pub struct TagOptions {
    /// Tag-Schlüssel
    pub key: String,
    /// Werte-Typ
    pub value_type: TagValueType,
    /// Obergrenze der Werte (CSV)
    pub values_max_count: Option<usize>,
    /// Erlaubte Werte
    pub options: Vec<String>,
}

/// Metadaten-Tabelle aller bekannten Tag-Schlüssel.
///
/// Unbekannte Schlüssel werden als skalar ohne Einschränkungen behandelt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSchema {
    /// Schlüssel, die in sortierten Listen zuerst erscheinen (in dieser Reihenfolge)
    #[serde(default)]
    pub primary_keys: Vec<String>,
    /// Metadaten je Schlüssel
    #[serde(default)]
    pub keys: IndexMap<String, TagKeyMeta>,
}

impl TagSchema {
    /// Erstellt ein leeres Schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fügt Metadaten für einen Schlüssel hinzu (Builder).
    pub fn with_key(mut self, key: &str, meta: TagKeyMeta) -> Self {
        self.keys.insert(key.to_string(), meta);
        self
    }

    /// Setzt die primären Schlüssel (Builder).
    pub fn with_primary_keys(mut self, keys: &[&str]) -> Self {
        self.primary_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Parsed ein Schema aus TOML.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Tag-Schema konnte nicht gelesen werden")
    }

    /// Lädt ein Schema aus einer TOML-Datei.
    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Tag-Schema nicht lesbar: {}", path.display()))?;
        let schema = Self::from_toml_str(&content)?;
        log::info!(
            "Tag-Schema geladen aus {} ({} Schluessel)",
            path.display(),
            schema.keys.len()
        );
        Ok(schema)
    }

    /// Metadaten eines Schlüssels.
    pub fn meta(&self, key: &str) -> Option<&TagKeyMeta> {
        self.keys.get(key)
    }

    /// Werte-Typ eines Schlüssels (unbekannt → skalar).
    pub fn value_type(&self, key: &str) -> TagValueType {
        self.meta(key).map(|m| m.value_type).unwrap_or_default()
    }

    fn is_csv(&self, key: &str) -> bool {
        self.value_type(key) == TagValueType::Csv
    }

    fn values_max_count(&self, key: &str) -> Option<usize> {
        self.meta(key).and_then(|m| m.values_max_count)
    }

    /// Bringt einen Wert in die Form seines Schlüssels (CSV-Text → Liste).
    pub fn normalize_value(&self, key: &str, value: TagValue) -> TagValue {
        if !self.is_csv(key) {
            return value;
        }
        let parts = match value {
            TagValue::Text(text) => split_csv(&text),
            other => other.values(),
        };
        TagValue::List(dedup_preserving_order(parts))
    }

    /// Fügt einen Wert hinzu: CSV hängt dedupliziert an, skalar überschreibt.
    pub fn add_tags(&self, tags: &TagMap, key: &str, value: TagValue) -> GraphResult<TagMap> {
        let mut result = tags.clone();
        if self.is_csv(key) {
            let current = self.current_values(tags, key);
            let additional = self.normalize_value(key, value).values();
            let combined = union_values(&current, &additional);
            self.check_max_count(key, &current, combined.len())?;
            result.insert(key.to_string(), TagValue::List(combined));
        } else {
            result.insert(key.to_string(), value);
        }
        Ok(result)
    }

    /// Vereinigt `partial` mit `tags`.
    ///
    /// CSV-Schlüssel vereinigen ihre Wertelisten, skalare Schlüssel dürfen nur
    /// gesetzt werden, wenn sie fehlen oder bereits denselben Wert tragen.
    pub fn merge_tags(&self, tags: &TagMap, partial: &TagMap) -> GraphResult<TagMap> {
        let mut result = tags.clone();
        for (key, value) in partial {
            if self.is_csv(key) {
                let current = self.current_values(tags, key);
                let additional = self.normalize_value(key, value.clone()).values();
                let combined = union_values(&current, &additional);
                self.check_max_count(key, &current, combined.len())?;
                result.insert(key.clone(), TagValue::List(combined));
            } else {
                match tags.get(key) {
                    Some(existing) if !existing.same_scalar(value) => {
                        return Err(GraphError::TagsMergeValueAlreadyExists {
                            key: key.clone(),
                            current_value: existing.as_text(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        result.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(result)
    }

    /// Trockenlauf von [`merge_tags`](Self::merge_tags).
    pub fn is_tags_mergeable(&self, tags: &TagMap, partial: &TagMap) -> bool {
        self.merge_tags(tags, partial).is_ok()
    }

    /// Entfernt einzelne Werte eines Schlüssels.
    ///
    /// CSV: der Eintrag bleibt (ggf. leer) bestehen. Skalar: der Schlüssel
    /// verschwindet, wenn sein Wert in `values` enthalten ist.
    pub fn delete_tags_values(&self, tags: &TagMap, key: &str, values: &[String]) -> TagMap {
        let mut result = tags.clone();
        let Some(existing) = tags.get(key) else {
            return result;
        };
        if self.is_csv(key) {
            let remaining = self
                .normalize_value(key, existing.clone())
                .values()
                .into_iter()
                .filter(|v| !values.contains(v))
                .collect();
            result.insert(key.to_string(), TagValue::List(remaining));
        } else if values.contains(&existing.as_text()) {
            result.remove(key);
        }
        result
    }

    /// Prüft ob `value` unter `key` gesetzt ist.
    pub fn is_tag_value_exist(&self, tags: &TagMap, key: &str, value: &str) -> bool {
        match tags.get(key) {
            Some(_) if self.is_csv(key) => self
                .current_values(tags, key)
                .iter()
                .any(|v| v == value),
            Some(existing) => existing.as_text() == value,
            None => false,
        }
    }

    /// Teilmengen-Prüfung: jeder Schlüssel aus `subset` muss in `target`
    /// vorhanden sein; CSV verlangt alle angefragten Werte, skalar Gleichheit.
    pub fn is_tags_contains(&self, target: &TagMap, subset: &TagMap) -> bool {
        subset.iter().all(|(key, wanted)| {
            let Some(existing) = target.get(key) else {
                return false;
            };
            if self.is_csv(key) {
                let present = self.normalize_value(key, existing.clone()).values();
                self.normalize_value(key, wanted.clone())
                    .values()
                    .iter()
                    .all(|v| present.contains(v))
            } else {
                existing.same_scalar(wanted)
            }
        })
    }

    /// Sortierung: primäre Schlüssel zuerst (konfigurierte Reihenfolge), dann lexikografisch.
    pub fn compare_keys(&self, a: &str, b: &str) -> Ordering {
        let pa = self.primary_keys.iter().position(|k| k == a);
        let pb = self.primary_keys.iter().position(|k| k == b);
        match (pa, pb) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// Schlüssel einer TagMap in Anzeige-Reihenfolge.
    pub fn sorted_keys<'a>(&self, tags: &'a TagMap) -> Vec<&'a str> {
        let mut keys: Vec<&str> = tags.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| self.compare_keys(a, b));
        keys
    }

    /// Bereinigt eine Benutzereingabe für `key` (trimmen, Länge, erlaubte Werte).
    pub fn refine_value(&self, key: &str, raw: &str) -> GraphResult<String> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(GraphError::InvalidValue {
                field: key.to_string(),
                reason: "leerer Wert".to_string(),
            });
        }
        let Some(meta) = self.meta(key) else {
            return Ok(value.to_string());
        };

        if let Some(max_length) = meta.max_length {
            let length = value.chars().count();
            if length > max_length {
                return Err(GraphError::ExceedMaxLength {
                    field: key.to_string(),
                    max_length,
                    length,
                });
            }
        }

        if !meta.options.is_empty() {
            let parts = if meta.value_type == TagValueType::Csv {
                split_csv(value)
            } else {
                vec![value.to_string()]
            };
            if let Some(unknown) = parts.iter().find(|p| !meta.options.contains(p)) {
                return Err(GraphError::InvalidValue {
                    field: key.to_string(),
                    reason: format!("'{unknown}' ist keine erlaubte Option"),
                });
            }
        }

        Ok(value.to_string())
    }

    /// Auswahl-Daten der angefragten Schlüssel; unbekannte Schlüssel werden übersprungen.
    pub fn options_data(&self, keys: &[&str]) -> Vec<TagOptions> {
        keys.iter()
            .filter_map(|key| {
                let meta = self.meta(key)?;
                Some(TagOptions {
                    key: key.to_string(),
                    value_type: meta.value_type,
                    values_max_count: meta.values_max_count,
                    options: meta.options.clone(),
                })
            })
            .collect()
    }

    /// Liefert `NotExists`, falls der Schlüssel nicht im Schema steht.
    pub fn require_key(&self, key: &str) -> GraphResult<&TagKeyMeta> {
        self.meta(key).ok_or_else(|| GraphError::NotExists {
            kind: FeatureKind::Tag,
            id: key.to_string(),
        })
    }

    /// Aktuelle Einzelwerte eines CSV-Schlüssels (CSV-Text wird zerlegt).
    fn current_values(&self, tags: &TagMap, key: &str) -> Vec<String> {
        tags.get(key)
            .map(|existing| self.normalize_value(key, existing.clone()).values())
            .unwrap_or_default()
    }

    fn check_max_count(&self, key: &str, current: &[String], count: usize) -> GraphResult<()> {
        match self.values_max_count(key) {
            Some(max) if count > max => Err(GraphError::TagsMergeExceededValuesMaxCount {
                key: key.to_string(),
                current_values: current.to_vec(),
            }),
            _ => Ok(()),
        }
    }
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !result.contains(&value) {
            result.push(value);
        }
    }
    result
}

fn union_values(current: &[String], additional: &[String]) -> Vec<String> {
    let mut combined = current.to_vec();
    for value in additional {
        if !combined.contains(value) {
            combined.push(value.clone());
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANES: &str = "lanes";
    const SURFACE: &str = "surface";

    fn schema() -> TagSchema {
        TagSchema::new()
            .with_key(LANES, TagKeyMeta::csv(3))
            .with_key(SURFACE, TagKeyMeta::scalar())
            .with_primary_keys(&[SURFACE, "name"])
    }

    fn tags(pairs: &[(&str, TagValue)]) -> TagMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn csv_merge_up_to_cap_succeeds() {
        let schema = schema();
        let merged = schema
            .merge_tags(
                &TagMap::new(),
                &tags(&[(LANES, TagValue::from(vec!["a", "b", "c"]))]),
            )
            .expect("Merge innerhalb der Obergrenze");
        assert_eq!(merged[LANES].values().len(), 3);
    }

    #[test]
    fn csv_merge_beyond_cap_fails_with_current_values() {
        let schema = schema();
        let base = tags(&[(LANES, TagValue::from(vec!["a", "b"]))]);
        let err = schema
            .merge_tags(&base, &tags(&[(LANES, TagValue::from("c,d"))]))
            .expect_err("Obergrenze überschritten");
        assert_eq!(
            err,
            GraphError::TagsMergeExceededValuesMaxCount {
                key: LANES.to_string(),
                current_values: vec!["a".to_string(), "b".to_string()],
            }
        );
        assert!(!schema.is_tags_mergeable(&base, &tags(&[(LANES, TagValue::from("c,d"))])));
    }

    #[test]
    fn csv_merge_deduplicates_existing_values() {
        let schema = schema();
        let base = tags(&[(LANES, TagValue::from(vec!["a", "b", "c"]))]);
        let merged = schema
            .merge_tags(&base, &tags(&[(LANES, TagValue::from("a,c"))]))
            .expect("Bereits vorhandene Werte zählen nicht doppelt");
        assert_eq!(merged, base);
    }

    #[test]
    fn scalar_conflict_is_rejected() {
        let schema = schema();
        let base = tags(&[(SURFACE, TagValue::from("B"))]);
        let err = schema
            .merge_tags(&base, &tags(&[(SURFACE, TagValue::from("A"))]))
            .expect_err("Konflikt erwartet");
        assert_eq!(
            err,
            GraphError::TagsMergeValueAlreadyExists {
                key: SURFACE.to_string(),
                current_value: "B".to_string(),
            }
        );
    }

    #[test]
    fn scalar_identical_merge_is_noop() {
        let schema = schema();
        let base = tags(&[(SURFACE, TagValue::from("A"))]);
        let merged = schema
            .merge_tags(&base, &tags(&[(SURFACE, TagValue::from("A"))]))
            .expect("Identischer Wert");
        assert_eq!(merged, base);

        // Zahl und Text mit gleicher Darstellung gelten als identisch
        let numeric = tags(&[("width", TagValue::Number(3.0))]);
        assert!(schema.is_tags_mergeable(&numeric, &tags(&[("width", TagValue::from("3"))])));
    }

    #[test]
    fn add_tags_appends_csv_and_overwrites_scalar() {
        let schema = schema();
        let base = tags(&[
            (LANES, TagValue::from(vec!["a"])),
            (SURFACE, TagValue::from("gravel")),
        ]);

        let added = schema
            .add_tags(&base, LANES, TagValue::from("b"))
            .expect("CSV anhängen");
        assert_eq!(added[LANES], TagValue::from(vec!["a", "b"]));

        let again = schema
            .add_tags(&added, LANES, TagValue::from("b"))
            .expect("Duplikat wird ignoriert");
        assert_eq!(again[LANES], TagValue::from(vec!["a", "b"]));

        let overwritten = schema
            .add_tags(&base, SURFACE, TagValue::from("asphalt"))
            .expect("Skalar überschreiben");
        assert_eq!(overwritten[SURFACE], TagValue::from("asphalt"));

        // Eingabe bleibt unverändert
        assert_eq!(base[LANES], TagValue::from(vec!["a"]));
    }

    #[test]
    fn add_tags_respects_cap() {
        let schema = schema();
        let full = tags(&[(LANES, TagValue::from(vec!["a", "b", "c"]))]);
        assert!(matches!(
            schema.add_tags(&full, LANES, TagValue::from("d")),
            Err(GraphError::TagsMergeExceededValuesMaxCount { .. })
        ));
    }

    #[test]
    fn delete_values_keeps_empty_csv_entry_and_drops_scalar() {
        let schema = schema();
        let base = tags(&[
            (LANES, TagValue::from(vec!["a", "b"])),
            (SURFACE, TagValue::from("gravel")),
        ]);

        let without_lanes =
            schema.delete_tags_values(&base, LANES, &["a".to_string(), "b".to_string()]);
        assert_eq!(without_lanes[LANES], TagValue::List(Vec::new()));

        let without_surface = schema.delete_tags_values(&base, SURFACE, &["gravel".to_string()]);
        assert!(!without_surface.contains_key(SURFACE));

        let untouched = schema.delete_tags_values(&base, SURFACE, &["asphalt".to_string()]);
        assert_eq!(untouched, base);
    }

    #[test]
    fn value_exist_and_subset_checks() {
        let schema = schema();
        let target = tags(&[
            (LANES, TagValue::from(vec!["a", "b"])),
            (SURFACE, TagValue::from("gravel")),
        ]);

        assert!(schema.is_tag_value_exist(&target, LANES, "b"));
        assert!(!schema.is_tag_value_exist(&target, LANES, "c"));
        assert!(schema.is_tag_value_exist(&target, SURFACE, "gravel"));

        assert!(schema.is_tags_contains(&target, &tags(&[(LANES, TagValue::from("b"))])));
        assert!(!schema.is_tags_contains(&target, &tags(&[(LANES, TagValue::from("b,c"))])));
        assert!(schema.is_tags_contains(&target, &tags(&[(SURFACE, TagValue::from("gravel"))])));
        assert!(!schema.is_tags_contains(&target, &tags(&[("name", TagValue::from("x"))])));
    }

    #[test]
    fn csv_text_in_base_map_counts_each_value() {
        let schema = schema();
        let base = tags(&[(LANES, TagValue::from("a,b,c"))]);

        let err = schema
            .merge_tags(&base, &tags(&[(LANES, TagValue::from("d"))]))
            .expect_err("Obergrenze gilt auch für CSV-Text");
        assert_eq!(
            err,
            GraphError::TagsMergeExceededValuesMaxCount {
                key: LANES.to_string(),
                current_values: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            }
        );
        assert!(schema
            .add_tags(&base, LANES, TagValue::from("d"))
            .is_err());
        let merged = schema
            .merge_tags(&base, &tags(&[(LANES, TagValue::from("b"))]))
            .expect("vorhandener Wert");
        assert_eq!(merged[LANES], TagValue::from(vec!["a", "b", "c"]));

        assert!(schema.is_tag_value_exist(&base, LANES, "a"));
        assert!(schema.is_tags_contains(&base, &tags(&[(LANES, TagValue::from("c,a"))])));

        let reduced = schema.delete_tags_values(&base, LANES, &["a".to_string()]);
        assert_eq!(reduced[LANES], TagValue::from(vec!["b", "c"]));
    }

    #[test]
    fn sorted_keys_puts_primary_first() {
        let schema = schema();
        let map = tags(&[
            ("zeta", TagValue::from("1")),
            ("alpha", TagValue::from("1")),
            ("name", TagValue::from("1")),
            (SURFACE, TagValue::from("1")),
        ]);
        assert_eq!(
            schema.sorted_keys(&map),
            vec![SURFACE, "name", "alpha", "zeta"]
        );
    }

    #[test]
    fn refine_value_checks_length_and_options() {
        let schema = TagSchema::new().with_key(
            "kind",
            TagKeyMeta {
                max_length: Some(5),
                options: vec!["road".to_string(), "path".to_string()],
                ..TagKeyMeta::default()
            },
        );
        assert_eq!(schema.refine_value("kind", "  road ").unwrap(), "road");
        assert!(matches!(
            schema.refine_value("kind", "highway"),
            Err(GraphError::ExceedMaxLength { max_length: 5, length: 7, .. })
        ));
        assert!(matches!(
            schema.refine_value("kind", "lane"),
            Err(GraphError::InvalidValue { .. })
        ));
        assert!(schema.refine_value("free", "anything").is_ok());
    }

    #[test]
    fn options_data_skips_unknown_keys() {
        let schema = schema();
        let data = schema.options_data(&[LANES, "unknown", SURFACE]);
        let keys: Vec<&str> = data.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec![LANES, SURFACE]);
        assert_eq!(data[0].values_max_count, Some(3));
    }

    #[test]
    fn schema_parses_from_toml() {
        let schema = TagSchema::from_toml_str(
            r#"
            primary_keys = ["highway"]

            [keys.highway]
            value_type = "scalar"
            options = ["primary", "service"]

            [keys.access]
            value_type = "csv"
            values_max_count = 2
            "#,
        )
        .expect("Gültiges TOML");
        assert_eq!(schema.value_type("access"), TagValueType::Csv);
        assert_eq!(schema.meta("access").unwrap().values_max_count, Some(2));
        assert_eq!(schema.value_type("unknown"), TagValueType::Scalar);
        assert!(schema.require_key("unknown").is_err());
    }
}
