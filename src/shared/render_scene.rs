//! Render-Payloads als expliziter Übergabevertrag zwischen Editor und Kartenansicht.
//!
//! Lebt im shared-Modul, da `app` sie baut und ein beliebiger Renderer sie konsumiert.

use crate::core::{LatLng, LineSegmentKey};
use serde::Serialize;

/// Darstellungsdaten eines Segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRenderPayload {
    /// Way des Segments
    pub way_id: i64,
    /// Start-Node
    pub node_start: i64,
    /// End-Node
    pub node_end: i64,
    /// Pfad [Start, Ende]
    pub path: [LatLng; 2],
    /// Linienfarbe
    pub stroke_color: String,
    /// Linienstärke in Pixeln
    pub stroke_weight: f32,
    /// Deckkraft
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

impl SegmentRenderPayload {
    /// Schlüssel des zugrunde liegenden Segments.
    pub fn key(&self) -> LineSegmentKey {
        LineSegmentKey::new(self.way_id, self.node_start, self.node_end)
    }
}

/// Darstellungsdaten eines Nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRenderPayload {
    /// Node-ID
    pub id: i64,
    /// Position
    pub position: LatLng,
    /// Sichtbarkeit
    pub visible: bool,
    /// Klickbarkeit
    pub clickable: bool,
    /// Verschiebbarkeit
    pub draggable: bool,
}

/// Read-only Daten für einen Render-Frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderScene {
    /// Segmente, nach z-Index und Schlüssel sortiert
    pub segments: Vec<SegmentRenderPayload>,
    /// Nodes, nach ID sortiert
    pub nodes: Vec<NodeRenderPayload>,
    /// Optionaler Kamera-Mittelpunkt (z.B. nach Löschen/Undo)
    pub focus: Option<LatLng>,
}

impl RenderScene {
    /// Gibt zurück, ob es überhaupt etwas zu zeichnen gibt.
    pub fn has_content(&self) -> bool {
        !self.segments.is_empty() || !self.nodes.is_empty()
    }

    /// Nur sichtbare Segmente.
    pub fn visible_segments(&self) -> impl Iterator<Item = &SegmentRenderPayload> {
        self.segments.iter().filter(|s| s.visible)
    }
}
