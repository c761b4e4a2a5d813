//! Events des Editors und zurückgestellte Änderungswünsche.
//!
//! `GraphEvent`s werden während einer Mutation gesammelt und erst an ihrem Ende
//! an die Listener verteilt. Listener können den Editor nicht borgen; wollen sie
//! selbst etwas ändern, legen sie einen `GraphRequest` in die `RequestQueue`.

use crate::core::{FeatureKind, LatLng, LineSegmentKey, TagMap, TagValue};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Tag-tragendes Feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagTarget {
    /// Node-ID
    Node(i64),
    /// Way-ID
    Way(i64),
}

impl TagTarget {
    /// Art und ID des Features.
    pub fn kind_and_id(self) -> (FeatureKind, i64) {
        match self {
            TagTarget::Node(id) => (FeatureKind::Node, id),
            TagTarget::Way(id) => (FeatureKind::Way, id),
        }
    }
}

/// Strukturelle oder inhaltliche Änderung am Graphen.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// Node angelegt oder wiederhergestellt
    NodeCreated(i64),
    /// Node entfernt
    NodeRemoved(i64),
    /// Node verschoben
    NodeMoved {
        /// Node-ID
        node_id: i64,
        /// Neue Position
        position: LatLng,
    },
    /// Way angelegt oder wiederhergestellt
    WayCreated(i64),
    /// Way entfernt
    WayRemoved(i64),
    /// Node-Liste eines Ways ersetzt
    WayNodesChanged(i64),
    /// Segment angelegt oder wiederhergestellt
    SegmentCreated(LineSegmentKey),
    /// Segment entfernt
    SegmentRemoved(LineSegmentKey),
    /// Sichtbarkeit geändert
    VisibilityChanged {
        /// Art des Features
        kind: FeatureKind,
        /// ID
        id: i64,
        /// Neuer Zustand
        visible: bool,
    },
    /// Tags eines Features geändert
    TagsChanged {
        /// Art des Features
        kind: FeatureKind,
        /// ID
        id: i64,
    },
    /// Undo/Redo-Verfügbarkeit
    HistoryChanged {
        /// Undo möglich
        can_undo: bool,
        /// Redo möglich
        can_redo: bool,
    },
}

impl GraphEvent {
    /// ID des betroffenen Features (Ways bei Segmenten), falls vorhanden.
    pub fn entity_id(&self) -> Option<i64> {
        match self {
            GraphEvent::NodeCreated(id)
            | GraphEvent::NodeRemoved(id)
            | GraphEvent::WayCreated(id)
            | GraphEvent::WayRemoved(id)
            | GraphEvent::WayNodesChanged(id) => Some(*id),
            GraphEvent::NodeMoved { node_id, .. } => Some(*node_id),
            GraphEvent::SegmentCreated(key) | GraphEvent::SegmentRemoved(key) => Some(key.way_id),
            GraphEvent::VisibilityChanged { id, .. } | GraphEvent::TagsChanged { id, .. } => {
                Some(*id)
            }
            GraphEvent::HistoryChanged { .. } => None,
        }
    }

    /// `true` für Undo/Redo-Meldungen.
    pub fn is_history(&self) -> bool {
        matches!(self, GraphEvent::HistoryChanged { .. })
    }
}

/// Zurückgestellter Änderungswunsch eines Listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphRequest {
    /// Nodes und Segmente löschen
    DeleteFeatures {
        /// Ziel-Nodes
        node_ids: Vec<i64>,
        /// Ziel-Segmente
        segment_keys: Vec<LineSegmentKey>,
    },
    /// Node verschieben
    MoveNode {
        /// Node-ID
        node_id: i64,
        /// Zielposition
        position: LatLng,
    },
    /// Sichtbarkeit eines Nodes setzen
    SetNodeVisible {
        /// Node-ID
        node_id: i64,
        /// Neuer Zustand
        visible: bool,
    },
    /// Sichtbarkeit eines Ways setzen
    SetWayVisible {
        /// Way-ID
        way_id: i64,
        /// Neuer Zustand
        visible: bool,
    },
    /// Einzelnen Tag-Wert hinzufügen
    AddTag {
        /// Ziel
        target: TagTarget,
        /// Schlüssel
        key: String,
        /// Wert
        value: TagValue,
    },
    /// Tags vereinigen
    MergeTags {
        /// Ziel
        target: TagTarget,
        /// Zu vereinigende Tags
        tags: TagMap,
    },
    /// Letzten Befehl rückgängig machen
    Undo,
    /// Rückgängig gemachten Befehl wiederholen
    Redo,
}

/// Geteilte FIFO-Warteschlange für Änderungswünsche.
///
/// Klone teilen dieselbe Warteschlange; Listener halten einen Klon.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    inner: Rc<RefCell<VecDeque<GraphRequest>>>,
}

impl RequestQueue {
    /// Erstellt eine leere Warteschlange.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stellt einen Wunsch hinten an.
    pub fn push(&self, request: GraphRequest) {
        self.inner.borrow_mut().push_back(request);
    }

    /// Entnimmt den ältesten Wunsch.
    pub fn pop(&self) -> Option<GraphRequest> {
        self.inner.borrow_mut().pop_front()
    }

    /// Anzahl wartender Wünsche
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Gibt `true` zurück, wenn nichts wartet.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Verwirft alle wartenden Wünsche.
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_clones_share_state() {
        let queue = RequestQueue::new();
        let handle = queue.clone();
        handle.push(GraphRequest::Undo);
        handle.push(GraphRequest::Redo);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(GraphRequest::Undo));
        assert_eq!(handle.pop(), Some(GraphRequest::Redo));
        assert!(queue.is_empty());
    }

    #[test]
    fn segment_events_report_way_id() {
        let event = GraphEvent::SegmentRemoved(LineSegmentKey::new(9, 2, 1));
        assert_eq!(event.entity_id(), Some(9));
        assert!(GraphEvent::HistoryChanged {
            can_undo: true,
            can_redo: false
        }
        .is_history());
    }
}
