//! Wegpunkt (Kreuzung/Zwischenpunkt) des Straßennetzes.

use super::{LatLng, TagMap};

/// Interaktions- und Sichtbarkeits-Optionen eines Nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOptions {
    /// Node wird gezeichnet
    pub visible: bool,
    /// Node reagiert auf Klicks
    pub clickable: bool,
    /// Node kann verschoben werden
    pub draggable: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            visible: true,
            clickable: true,
            draggable: false,
        }
    }
}

/// Ein Wegpunkt mit Position und Tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Eindeutige ID innerhalb des Stores
    pub id: i64,
    /// Geo-Position
    pub position: LatLng,
    /// Klassifizierungs-Tags
    pub tags: TagMap,
    /// Sichtbarkeit
    pub visible: bool,
    /// Klickbarkeit
    pub clickable: bool,
    /// Verschiebbarkeit
    pub draggable: bool,
}

impl Node {
    /// Erstellt einen neuen Node
    pub fn new(id: i64, position: LatLng, options: NodeOptions, tags: TagMap) -> Self {
        Self {
            id,
            position,
            tags,
            visible: options.visible,
            clickable: options.clickable,
            draggable: options.draggable,
        }
    }

    /// Aktuelle Optionen als Wert.
    pub fn options(&self) -> NodeOptions {
        NodeOptions {
            visible: self.visible,
            clickable: self.clickable,
            draggable: self.draggable,
        }
    }
}
