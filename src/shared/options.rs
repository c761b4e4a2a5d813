//! Zentrale Konfiguration des Road-Graph-Editors.
//!
//! `EditorOptions` enthält alle zur Laufzeit änderbaren Werte.
//! Die `const`-Werte bleiben als Fallback/Default erhalten.

use crate::core::line_segment::{
    SEGMENT_STROKE_COLOR, SEGMENT_STROKE_OPACITY, SEGMENT_STROKE_WEIGHT, SEGMENT_Z_INDEX,
};
use crate::core::{GraphError, GraphResult, LineSegmentStyle, DISTANCE_THRESHOLD};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

// ── Way-Tracker ─────────────────────────────────────────────────────

/// Debounce-Fenster für Enter/Exit-Meldungen in Millisekunden.
pub const TRACKER_DEBOUNCE_MS: u64 = 300;
/// Tag-Schlüssel, nach dessen Wert Ways gruppiert werden.
pub const TRACKER_GROUP_TAG_KEY: &str = "highway";

// ── History ─────────────────────────────────────────────────────────

/// Maximale Anzahl Undo-Schritte.
pub const HISTORY_MAX_DEPTH: usize = 200;

// ── Tags ────────────────────────────────────────────────────────────

/// Schlüssel, die in sortierten Tag-Listen zuerst erscheinen.
pub const PRIMARY_TAG_KEYS: [&str; 2] = ["highway", "name"];

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Alle zur Laufzeit änderbaren Editor-Optionen.
/// Wird als `road_graph_editor.toml` neben der Binary gespeichert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorOptions {
    // ── Segmente ────────────────────────────────────────────────
    /// Linienfarbe neuer Segmente (`#RRGGBB` oder `#RRGGBBAA`)
    pub segment_stroke_color: String,
    /// Linienstärke neuer Segmente in Pixeln
    pub segment_stroke_weight: f32,
    /// Deckkraft neuer Segmente
    pub segment_stroke_opacity: f32,
    /// Zeichenreihenfolge neuer Segmente
    #[serde(default = "default_segment_z_index")]
    pub segment_z_index: i32,

    // ── Way-Tracker ─────────────────────────────────────────────
    /// Maximaler Abstand (Grad) für "Position liegt auf dem Way"
    pub distance_threshold: f64,
    /// Debounce-Fenster in Millisekunden
    pub tracker_debounce_ms: u64,
    /// Gruppierungs-Tag
    #[serde(default = "default_tracker_group_tag_key")]
    pub tracker_group_tag_key: String,

    // ── History ─────────────────────────────────────────────────
    /// Maximale Undo-Tiefe
    pub history_max_depth: usize,

    // ── Tags ────────────────────────────────────────────────────
    /// Primäre Tag-Schlüssel (falls das Schema keine eigenen vorgibt)
    #[serde(default = "default_primary_tag_keys")]
    pub primary_tag_keys: Vec<String>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            segment_stroke_color: SEGMENT_STROKE_COLOR.to_string(),
            segment_stroke_weight: SEGMENT_STROKE_WEIGHT,
            segment_stroke_opacity: SEGMENT_STROKE_OPACITY,
            segment_z_index: SEGMENT_Z_INDEX,

            distance_threshold: DISTANCE_THRESHOLD,
            tracker_debounce_ms: TRACKER_DEBOUNCE_MS,
            tracker_group_tag_key: TRACKER_GROUP_TAG_KEY.to_string(),

            history_max_depth: HISTORY_MAX_DEPTH,

            primary_tag_keys: default_primary_tag_keys(),
        }
    }
}

/// Serde-Default für `segment_z_index` (Abwärtskompatibilität).
fn default_segment_z_index() -> i32 {
    SEGMENT_Z_INDEX
}

fn default_tracker_group_tag_key() -> String {
    TRACKER_GROUP_TAG_KEY.to_string()
}

fn default_primary_tag_keys() -> Vec<String> {
    PRIMARY_TAG_KEYS.iter().map(|k| k.to_string()).collect()
}

fn color_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^#(?:[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").ok())
        .as_ref()
}

/// Prüft eine Farbangabe im Format `#RRGGBB` oder `#RRGGBBAA`.
pub fn is_valid_color(color: &str) -> bool {
    color_pattern().is_some_and(|re| re.is_match(color))
}

impl EditorOptions {
    /// Lädt Optionen aus einer TOML-Datei. Bei Fehler: Standardwerte.
    pub fn load_from_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Self>(&content) {
                Ok(opts) => match opts.validate() {
                    Ok(()) => {
                        log::info!("Optionen geladen aus: {}", path.display());
                        opts
                    }
                    Err(e) => {
                        log::warn!("Optionen ungültig, verwende Standardwerte: {}", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Optionen-Datei fehlerhaft, verwende Standardwerte: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Optionen-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Speichert Optionen als TOML-Datei.
    pub fn save_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Optionen gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Ermittelt den Pfad zur Optionen-Datei neben der Binary.
    pub fn config_path() -> std::path::PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| std::path::PathBuf::from("road-graph-editor"))
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("road_graph_editor.toml")
    }

    /// Prüft Farbformat, Deckkraft, Linienstärke und Schwellwert.
    pub fn validate(&self) -> GraphResult<()> {
        if !is_valid_color(&self.segment_stroke_color) {
            return Err(GraphError::InvalidValue {
                field: "segment_stroke_color".to_string(),
                reason: format!("'{}' ist keine Farbe", self.segment_stroke_color),
            });
        }
        if !(0.0..=1.0).contains(&self.segment_stroke_opacity) {
            return Err(GraphError::InvalidValue {
                field: "segment_stroke_opacity".to_string(),
                reason: format!("{} liegt nicht in [0, 1]", self.segment_stroke_opacity),
            });
        }
        if self.segment_stroke_weight.is_nan() || self.segment_stroke_weight < 0.0 {
            return Err(GraphError::InvalidValue {
                field: "segment_stroke_weight".to_string(),
                reason: "muss >= 0 sein".to_string(),
            });
        }
        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(GraphError::InvalidValue {
                field: "distance_threshold".to_string(),
                reason: "muss > 0 sein".to_string(),
            });
        }
        Ok(())
    }

    /// Style für neu angelegte Segmente.
    pub fn segment_style(&self) -> LineSegmentStyle {
        LineSegmentStyle {
            stroke_color: self.segment_stroke_color.clone(),
            stroke_weight: self.segment_stroke_weight,
            stroke_opacity: self.segment_stroke_opacity,
            z_index: self.segment_z_index,
            ..LineSegmentStyle::default()
        }
    }

    /// Debounce-Fenster des Way-Trackers.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.tracker_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_roundtrip_through_toml() {
        let options = EditorOptions::default();
        assert!(options.validate().is_ok());

        let text = toml::to_string_pretty(&options).expect("serialisierbar");
        let parsed: EditorOptions = toml::from_str(&text).expect("parsebar");
        assert_eq!(parsed, options);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let text = r##"
segment_stroke_color = "#112233"
segment_stroke_weight = 2.0
segment_stroke_opacity = 0.5
distance_threshold = 0.0001
tracker_debounce_ms = 50
history_max_depth = 10
"##;
        let parsed: EditorOptions = toml::from_str(text).expect("parsebar");
        assert_eq!(parsed.segment_z_index, SEGMENT_Z_INDEX);
        assert_eq!(parsed.tracker_group_tag_key, "highway");
        assert_eq!(parsed.debounce_window(), Duration::from_millis(50));
        assert_eq!(parsed.segment_style().stroke_color, "#112233");
    }

    #[test]
    fn color_validation() {
        assert!(is_valid_color("#3388FF"));
        assert!(is_valid_color("#3388ff80"));
        assert!(!is_valid_color("3388FF"));
        assert!(!is_valid_color("#3388F"));
        assert!(!is_valid_color("red"));

        let options = EditorOptions {
            segment_stroke_color: "blue".to_string(),
            ..EditorOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(GraphError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_from_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("road_graph_editor_missing_options.toml");
        let _ = std::fs::remove_file(&path);
        assert_eq!(EditorOptions::load_from_file(&path), EditorOptions::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "road_graph_editor_options_{}.toml",
            std::process::id()
        ));
        let options = EditorOptions {
            history_max_depth: 7,
            ..EditorOptions::default()
        };
        options.save_to_file(&path).expect("speichern");
        assert_eq!(EditorOptions::load_from_file(&path), options);
        let _ = std::fs::remove_file(&path);
    }
}
