//! Verwaltung der abgeleiteten Line-Segmente.
//!
//! Hält genau ein Segment pro benachbartem Node-Paar pro Way. Der Manager wird
//! **nicht** automatisch über Änderungen im `FeatureStore` informiert: wer Nodes
//! verschiebt oder Ways/Nodes löscht, ruft die passenden Methoden hier selbst auf.

use super::{FeatureKind, FeatureStore, GraphError, GraphResult};
use super::{LineSegment, LineSegmentKey, LineSegmentStyle, Node, Way};
use std::collections::{HashMap, HashSet};

/// Ergebnis eines Abgleichs zwischen Way und seinen Segmenten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentSync {
    /// Neu angelegte Segmente
    pub created: Vec<LineSegmentKey>,
    /// Verworfene veraltete Segmente
    pub removed: Vec<LineSegment>,
}

/// Cache aller live Segmente, indexiert nach (Way, Node-Paar).
#[derive(Debug, Clone, Default)]
pub struct LineSegmentManager {
    segments: HashMap<LineSegmentKey, LineSegment>,
    default_style: LineSegmentStyle,
}

impl LineSegmentManager {
    /// Erstellt einen leeren Manager mit Standard-Style für neue Segmente.
    pub fn new(default_style: LineSegmentStyle) -> Self {
        Self {
            segments: HashMap::new(),
            default_style,
        }
    }

    /// Style, mit dem Segmente ohne explizite Angabe erstellt werden.
    pub fn default_style(&self) -> &LineSegmentStyle {
        &self.default_style
    }

    /// Legt ein Segment an oder liefert das bereits vorhandene unverändert zurück.
    ///
    /// Start und Ende müssen im Way direkt benachbart sein.
    pub fn create_line_segment(
        &mut self,
        way: &Way,
        node_start: &Node,
        node_end: &Node,
        style: Option<LineSegmentStyle>,
    ) -> GraphResult<&LineSegment> {
        if way.adjacent_pair_index(node_start.id, node_end.id).is_none() {
            return Err(GraphError::InvalidGraph(format!(
                "Nodes {} und {} sind in Way {} nicht benachbart",
                node_start.id, node_end.id, way.id
            )));
        }
        let key = LineSegmentKey::new(way.id, node_start.id, node_end.id);
        let default_style = &self.default_style;
        let segment = self.segments.entry(key).or_insert_with(|| {
            let mut style = style.unwrap_or_else(|| default_style.clone());
            style.visible = style.visible && way.visible;
            LineSegment::new(
                way.id,
                node_start.id,
                node_end.id,
                [node_start.position, node_end.position],
                style,
            )
        });
        Ok(&*segment)
    }

    /// Sucht ein Segment; die Reihenfolge von Start und Ende ist egal.
    pub fn get_line_segment(
        &self,
        way_id: i64,
        node_start: i64,
        node_end: i64,
    ) -> Option<&LineSegment> {
        self.segments
            .get(&LineSegmentKey::new(way_id, node_start, node_end))
    }

    /// Sucht ein Segment per Schlüssel.
    pub fn get_by_key(&self, key: &LineSegmentKey) -> Option<&LineSegment> {
        self.segments.get(key)
    }

    /// Veränderbarer Zugriff (z.B. für Style-Änderungen).
    pub fn get_line_segment_mut(&mut self, key: &LineSegmentKey) -> GraphResult<&mut LineSegment> {
        self.segments
            .get_mut(key)
            .ok_or_else(|| GraphError::NotExists {
                kind: FeatureKind::LineSegment,
                id: format!("{}:{}-{}", key.way_id, key.node_low, key.node_high),
            })
    }

    /// Entfernt ein einzelnes Segment.
    pub fn delete_line_segment(&mut self, key: &LineSegmentKey) -> Option<LineSegment> {
        self.segments.remove(key)
    }

    /// Entfernt alle Segmente eines Ways (nach Schlüssel sortiert zurückgegeben).
    pub fn delete_line_segments_of_way(&mut self, way_id: i64) -> Vec<LineSegment> {
        self.remove_where(|key| key.way_id == way_id)
    }

    /// Entfernt alle Segmente, die den Node berühren.
    pub fn delete_line_segments_of_node(&mut self, node_id: i64) -> Vec<LineSegment> {
        self.remove_where(|key| key.touches(node_id))
    }

    fn remove_where(&mut self, predicate: impl Fn(&LineSegmentKey) -> bool) -> Vec<LineSegment> {
        let mut keys: Vec<LineSegmentKey> = self
            .segments
            .keys()
            .filter(|key| predicate(key))
            .copied()
            .collect();
        keys.sort_unstable();
        keys.iter()
            .filter_map(|key| self.segments.remove(key))
            .collect()
    }

    /// Segmente eines Ways, nach Schlüssel sortiert.
    pub fn segments_of_way(&self, way_id: i64) -> Vec<&LineSegment> {
        let mut result: Vec<&LineSegment> = self
            .segments
            .values()
            .filter(|s| s.way_id == way_id)
            .collect();
        result.sort_by_key(|s| s.key());
        result
    }

    /// Gleicht die Segmente eines Ways mit seiner aktuellen Node-Liste ab:
    /// veraltete Paare werden verworfen, fehlende mit Standard-Style angelegt.
    pub fn sync_way(&mut self, way: &Way, store: &FeatureStore) -> GraphResult<SegmentSync> {
        let wanted: HashSet<LineSegmentKey> = way
            .node_pairs()
            .map(|(a, b)| LineSegmentKey::new(way.id, a, b))
            .collect();

        let removed = self.remove_where(|key| key.way_id == way.id && !wanted.contains(key));

        let mut created = Vec::new();
        for (a, b) in way.node_pairs() {
            let key = LineSegmentKey::new(way.id, a, b);
            if self.segments.contains_key(&key) {
                continue;
            }
            let start = store.get_node(a)?;
            let end = store.get_node(b)?;
            self.create_line_segment(way, start, end, None)?;
            created.push(key);
        }

        Ok(SegmentSync { created, removed })
    }

    /// Aktualisiert die Pfade aller Segmente, die den Node berühren.
    ///
    /// Gibt die Schlüssel der aktualisierten Segmente zurück.
    pub fn update_paths_of_node(&mut self, node: &Node) -> Vec<LineSegmentKey> {
        let mut updated = Vec::new();
        for segment in self.segments.values_mut() {
            if segment.node_start == node.id {
                segment.update_path(node.position, segment.path[1]);
            } else if segment.node_end == node.id {
                segment.update_path(segment.path[0], node.position);
            } else {
                continue;
            }
            updated.push(segment.key());
        }
        updated.sort_unstable();
        updated
    }

    /// Setzt die Sichtbarkeit aller Segmente eines Ways.
    pub fn set_way_visible(&mut self, way_id: i64, visible: bool) -> usize {
        let mut count = 0;
        for segment in self.segments.values_mut().filter(|s| s.way_id == way_id) {
            segment.style.visible = visible;
            count += 1;
        }
        count
    }

    /// Iterator über alle Segmente (read-only, ungeordnet).
    pub fn iter(&self) -> impl Iterator<Item = &LineSegment> {
        self.segments.values()
    }

    /// Alle Schlüssel, sortiert.
    pub fn keys(&self) -> Vec<LineSegmentKey> {
        let mut keys: Vec<LineSegmentKey> = self.segments.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Gibt die Anzahl der Segmente zurück
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Gibt `true` zurück, wenn keine Segmente existieren.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Fügt ein zuvor entferntes Segment unverändert wieder ein (Undo).
    ///
    /// Existiert der Schlüssel bereits, bleibt das vorhandene Segment erhalten.
    pub fn restore_line_segment(&mut self, segment: LineSegment) -> bool {
        let key = segment.key();
        if self.segments.contains_key(&key) {
            return false;
        }
        self.segments.insert(key, segment);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LatLng;

    fn store_with_way() -> FeatureStore {
        let mut store = FeatureStore::new();
        for id in 1..=3 {
            store
                .create_node(id, LatLng::new(0.0, id as f64), None, None)
                .unwrap();
        }
        store.create_way(100, &[1, 2, 3], None, None).unwrap();
        store
    }

    #[test]
    fn create_is_idempotent_and_lookup_symmetric() {
        let store = store_with_way();
        let way = store.get_way(100).unwrap();
        let mut manager = LineSegmentManager::default();

        let style = LineSegmentStyle {
            stroke_weight: 9.0,
            ..LineSegmentStyle::default()
        };
        manager
            .create_line_segment(
                way,
                store.get_node(1).unwrap(),
                store.get_node(2).unwrap(),
                Some(style.clone()),
            )
            .unwrap();
        // Zweiter Aufruf (umgekehrte Reihenfolge, anderer Style) liefert das vorhandene Segment
        let again = manager
            .create_line_segment(
                way,
                store.get_node(2).unwrap(),
                store.get_node(1).unwrap(),
                None,
            )
            .unwrap();
        assert_eq!(again.style, style);
        assert_eq!(manager.len(), 1);

        let forward = manager.get_line_segment(100, 1, 2).expect("Segment");
        let backward = manager.get_line_segment(100, 2, 1).expect("Segment");
        assert!(std::ptr::eq(forward, backward));
    }

    #[test]
    fn create_rejects_non_adjacent_pair() {
        let store = store_with_way();
        let way = store.get_way(100).unwrap();
        let mut manager = LineSegmentManager::default();
        let result = manager.create_line_segment(
            way,
            store.get_node(1).unwrap(),
            store.get_node(3).unwrap(),
            None,
        );
        assert!(matches!(result, Err(GraphError::InvalidGraph(_))));
        assert!(manager.is_empty());
    }

    #[test]
    fn sync_way_creates_and_purges() {
        let mut store = store_with_way();
        let mut manager = LineSegmentManager::default();

        let sync = manager
            .sync_way(store.get_way(100).unwrap(), &store)
            .unwrap();
        assert_eq!(sync.created.len(), 2);
        assert!(sync.removed.is_empty());

        store.set_way_nodes(100, &[1, 3]).unwrap();
        let sync = manager
            .sync_way(store.get_way(100).unwrap(), &store)
            .unwrap();
        assert_eq!(sync.created, vec![LineSegmentKey::new(100, 1, 3)]);
        assert_eq!(sync.removed.len(), 2);
        assert_eq!(manager.keys(), vec![LineSegmentKey::new(100, 1, 3)]);
    }

    #[test]
    fn delete_by_node_and_way() {
        let store = store_with_way();
        let mut manager = LineSegmentManager::default();
        manager
            .sync_way(store.get_way(100).unwrap(), &store)
            .unwrap();

        let removed = manager.delete_line_segments_of_node(2);
        assert_eq!(removed.len(), 2);
        assert!(manager.is_empty());

        manager
            .sync_way(store.get_way(100).unwrap(), &store)
            .unwrap();
        assert_eq!(manager.delete_line_segments_of_way(100).len(), 2);
        assert!(manager.delete_line_segments_of_way(100).is_empty());
    }

    #[test]
    fn update_paths_follows_moved_node() {
        let mut store = store_with_way();
        let mut manager = LineSegmentManager::default();
        manager
            .sync_way(store.get_way(100).unwrap(), &store)
            .unwrap();

        store
            .update_node_position(2, LatLng::new(5.0, 5.0))
            .unwrap();
        let updated = manager.update_paths_of_node(store.get_node(2).unwrap());
        assert_eq!(updated.len(), 2);

        let left = manager.get_line_segment(100, 1, 2).unwrap();
        assert_eq!(left.path[1], LatLng::new(5.0, 5.0));
        let right = manager.get_line_segment(100, 2, 3).unwrap();
        assert_eq!(right.path[0], LatLng::new(5.0, 5.0));
    }

    #[test]
    fn restore_keeps_existing_segment() {
        let store = store_with_way();
        let mut manager = LineSegmentManager::default();
        manager
            .sync_way(store.get_way(100).unwrap(), &store)
            .unwrap();
        let removed = manager
            .delete_line_segment(&LineSegmentKey::new(100, 2, 1))
            .expect("Segment vorhanden");

        assert!(manager.restore_line_segment(removed.clone()));
        assert!(!manager.restore_line_segment(removed));
        assert_eq!(manager.len(), 2);
    }
}
