//! Repräsentiert ein Segment zwischen zwei benachbarten Nodes eines Ways.

use super::LatLng;

/// Standard-Linienfarbe
pub const SEGMENT_STROKE_COLOR: &str = "#3388FF";
/// Standard-Linienstärke in Pixeln
pub const SEGMENT_STROKE_WEIGHT: f32 = 4.0;
/// Standard-Deckkraft
pub const SEGMENT_STROKE_OPACITY: f32 = 1.0;
/// Standard-Zeichenreihenfolge
pub const SEGMENT_Z_INDEX: i32 = 1;

/// Schlüssel eines Segments: Way + ungeordnetes Node-Paar.
///
/// `new` normalisiert das Paar, sodass (A, B) und (B, A) denselben Schlüssel ergeben.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineSegmentKey {
    /// Besitzender Way
    pub way_id: i64,
    /// Kleinere Node-ID
    pub node_low: i64,
    /// Größere Node-ID
    pub node_high: i64,
}

impl LineSegmentKey {
    /// Erstellt einen normalisierten Schlüssel
    pub fn new(way_id: i64, node_a: i64, node_b: i64) -> Self {
        Self {
            way_id,
            node_low: node_a.min(node_b),
            node_high: node_a.max(node_b),
        }
    }

    /// Prüft ob der Node eines der Enden ist.
    pub fn touches(&self, node_id: i64) -> bool {
        self.node_low == node_id || self.node_high == node_id
    }
}

/// Darstellungs-Zustand eines Segments (bleibt über Neuberechnungen erhalten).
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegmentStyle {
    /// Linienfarbe (`#RRGGBB` oder `#RRGGBBAA`)
    pub stroke_color: String,
    /// Linienstärke in Pixeln
    pub stroke_weight: f32,
    /// Deckkraft (0.0 – 1.0)
    pub stroke_opacity: f32,
    /// Zeichenreihenfolge
    pub z_index: i32,
    /// Sichtbarkeit
    pub visible: bool,
    /// Klickbarkeit
    pub clickable: bool,
    /// Verschiebbarkeit
    pub draggable: bool,
}

impl Default for LineSegmentStyle {
    fn default() -> Self {
        Self {
            stroke_color: SEGMENT_STROKE_COLOR.to_string(),
            stroke_weight: SEGMENT_STROKE_WEIGHT,
            stroke_opacity: SEGMENT_STROKE_OPACITY,
            z_index: SEGMENT_Z_INDEX,
            visible: true,
            clickable: true,
            draggable: false,
        }
    }
}

/// Ein Segment mit gecachtem Pfad und Style.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment {
    /// Besitzender Way
    pub way_id: i64,
    /// Start-Node (Erstellungs-Reihenfolge)
    pub node_start: i64,
    /// End-Node (Erstellungs-Reihenfolge)
    pub node_end: i64,
    /// Pfad-Endpunkte [Start, Ende]
    pub path: [LatLng; 2],
    /// Darstellungs-Zustand
    pub style: LineSegmentStyle,
}

impl LineSegment {
    /// Erstellt ein neues Segment
    pub fn new(
        way_id: i64,
        node_start: i64,
        node_end: i64,
        path: [LatLng; 2],
        style: LineSegmentStyle,
    ) -> Self {
        Self {
            way_id,
            node_start,
            node_end,
            path,
            style,
        }
    }

    /// Normalisierter Schlüssel des Segments.
    pub fn key(&self) -> LineSegmentKey {
        LineSegmentKey::new(self.way_id, self.node_start, self.node_end)
    }

    /// Aktualisiert die Endpunkte nach einer Node-Verschiebung.
    pub fn update_path(&mut self, start: LatLng, end: LatLng) {
        self.path = [start, end];
    }

    /// Position eines Endpunkts, falls der Node zum Segment gehört.
    pub fn endpoint_of(&self, node_id: i64) -> Option<LatLng> {
        if node_id == self.node_start {
            Some(self.path[0])
        } else if node_id == self.node_end {
            Some(self.path[1])
        } else {
            None
        }
    }
}
