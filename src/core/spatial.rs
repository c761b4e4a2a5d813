//! KD-Tree über den Node-Positionen für Picking-Abfragen.
//!
//! Positionen werden vor dem Einfügen planar projiziert: Längengrade werden mit
//! `cos` der mittleren Breite aller Nodes skaliert. Distanzen sind damit
//! näherungsweise in Breitengrad-Einheiten, unabhängig von der Himmelsrichtung.

use std::collections::HashMap;

use kiddo::{KdTree, SquaredEuclidean};

use crate::core::{LatLng, Node};

/// Treffer einer Abfrage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMatch {
    /// Gefundener Node
    pub node_id: i64,
    /// Projizierte Distanz zum Suchpunkt (Grad Breite)
    pub distance: f64,
}

/// Unveränderlicher Schnappschuss der Node-Positionen.
///
/// Wird nach Änderungen komplett neu gebaut (siehe `FeatureStore::ensure_spatial_index`).
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: KdTree<f64, 2>,
    /// Node-ID je Tree-Eintrag (Eintrags-Index = Position im Vec)
    slots: Vec<i64>,
    lng_scale: f64,
}

impl SpatialIndex {
    /// Index ohne Einträge.
    pub fn empty() -> Self {
        Self {
            tree: KdTree::new(),
            slots: Vec::new(),
            lng_scale: 1.0,
        }
    }

    /// Baut den Index über alle Nodes (deterministisch nach ID geordnet).
    pub fn from_nodes(nodes: &HashMap<i64, Node>) -> Self {
        if nodes.is_empty() {
            return Self::empty();
        }
        let mut slots: Vec<i64> = nodes.keys().copied().collect();
        slots.sort_unstable();

        let mean_lat = nodes.values().map(|n| n.position.lat).sum::<f64>() / nodes.len() as f64;
        let lng_scale = mean_lat.to_radians().cos();

        let mut tree: KdTree<f64, 2> = KdTree::with_capacity(slots.len());
        for (slot, id) in slots.iter().enumerate() {
            if let Some(node) = nodes.get(id) {
                tree.add(&project(node.position, lng_scale), slot as u64);
            }
        }

        Self {
            tree,
            slots,
            lng_scale,
        }
    }

    /// Anzahl indexierter Nodes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` ohne Einträge.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Nächster Node zur Position.
    pub fn nearest(&self, query: LatLng) -> Option<SpatialMatch> {
        if self.is_empty() {
            return None;
        }
        let hit = self
            .tree
            .nearest_one::<SquaredEuclidean>(&project(query, self.lng_scale));
        self.to_match(hit.item, hit.distance)
    }

    /// Alle Nodes im Radius, aufsteigend nach Distanz (Gleichstand: kleinere ID zuerst).
    pub fn within_radius(&self, query: LatLng, radius: f64) -> Vec<SpatialMatch> {
        if self.is_empty() || radius.is_nan() || radius.is_sign_negative() {
            return Vec::new();
        }
        let mut matches: Vec<SpatialMatch> = self
            .tree
            .within_unsorted::<SquaredEuclidean>(&project(query, self.lng_scale), radius * radius)
            .into_iter()
            .filter_map(|hit| self.to_match(hit.item, hit.distance))
            .collect();
        matches.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.node_id.cmp(&b.node_id))
        });
        matches
    }

    fn to_match(&self, slot: u64, squared_distance: f64) -> Option<SpatialMatch> {
        let node_id = *self.slots.get(usize::try_from(slot).ok()?)?;
        Some(SpatialMatch {
            node_id,
            distance: squared_distance.sqrt(),
        })
    }
}

fn project(position: LatLng, lng_scale: f64) -> [f64; 2] {
    [position.lat, position.lng * lng_scale]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NodeOptions, TagMap};
    use approx::assert_relative_eq;

    fn index_of(points: &[(i64, f64, f64)]) -> SpatialIndex {
        let nodes = points
            .iter()
            .map(|&(id, lat, lng)| {
                let node = Node::new(id, LatLng::new(lat, lng), NodeOptions::default(), TagMap::new());
                (id, node)
            })
            .collect();
        SpatialIndex::from_nodes(&nodes)
    }

    #[test]
    fn nearest_picks_closest_node() {
        let index = index_of(&[(1, 0.0, 0.0), (2, 0.0, 10.0), (3, 3.0, 4.0)]);
        let hit = index.nearest(LatLng::new(2.9, 3.9)).expect("Treffer erwartet");

        assert_eq!(hit.node_id, 3);
        assert!(hit.distance < 0.2);
    }

    #[test]
    fn longitude_is_scaled_by_latitude() {
        // Bei 60° Breite ist ein Längengrad nur halb so lang wie ein Breitengrad
        let index = index_of(&[(1, 60.0, 0.0), (2, 60.0, 0.002), (3, 60.0015, 0.0)]);
        let hits = index.within_radius(LatLng::new(60.0, 0.0), 0.0012);

        let ids: Vec<i64> = hits.iter().map(|m| m.node_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_relative_eq!(hits[1].distance, 0.001, epsilon = 1e-5);
    }

    #[test]
    fn radius_ties_are_ordered_by_id() {
        let index = index_of(&[(5, 0.0, 1.0), (4, 0.0, -1.0), (9, 5.0, 5.0)]);
        let ids: Vec<i64> = index
            .within_radius(LatLng::new(0.0, 0.0), 1.5)
            .into_iter()
            .map(|m| m.node_id)
            .collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn empty_index_and_negative_radius_yield_nothing() {
        let index = SpatialIndex::empty();
        assert!(index.is_empty());
        assert!(index.nearest(LatLng::new(0.0, 0.0)).is_none());

        let index = index_of(&[(1, 0.0, 0.0)]);
        assert_eq!(index.len(), 1);
        assert!(index.within_radius(LatLng::new(0.0, 0.0), -1.0).is_empty());
    }
}
