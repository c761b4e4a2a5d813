//! Der FeatureStore: alleiniger Besitzer aller Nodes und Ways.
//!
//! Ways und Line-Segmente speichern nur IDs und lösen sie hier auf.
//! Löschen entfernt nur das ID-Mapping; kaskadierende Löschungen
//! übernimmt der `FeatureCommand`.

use super::way::collapse_consecutive_duplicates;
use super::{FeatureKind, GraphError, GraphResult};
use super::{LatLng, Node, NodeOptions, TagMap, Way};
use super::{SpatialIndex, SpatialMatch};
use std::collections::HashMap;

/// Container für alle Nodes und Ways
#[derive(Debug, Clone)]
pub struct FeatureStore {
    nodes: HashMap<i64, Node>,
    ways: HashMap<i64, Way>,
    /// Persistenter Spatial-Index fuer schnelle Node-Abfragen
    spatial_index: SpatialIndex,
    spatial_dirty: bool,
}

impl FeatureStore {
    /// Erstellt einen neuen leeren Store
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            ways: HashMap::new(),
            spatial_index: SpatialIndex::empty(),
            spatial_dirty: false,
        }
    }

    /// Legt einen neuen Node an.
    ///
    /// Eine bereits vergebene ID ist ein Fehler (`DuplicateId`); der Store
    /// überschreibt niemals still.
    pub fn create_node(
        &mut self,
        id: i64,
        position: LatLng,
        options: Option<NodeOptions>,
        tags: Option<TagMap>,
    ) -> GraphResult<&Node> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateId {
                kind: FeatureKind::Node,
                id,
            });
        }
        let node = Node::new(
            id,
            position,
            options.unwrap_or_default(),
            tags.unwrap_or_default(),
        );
        self.spatial_dirty = true;
        Ok(&*self.nodes.entry(id).or_insert(node))
    }

    /// Legt einen neuen Way an.
    ///
    /// Direkt aufeinanderfolgende Duplikate werden zusammengefasst. Danach müssen
    /// mindestens zwei verschiedene, existierende Node-IDs übrig bleiben.
    pub fn create_way(
        &mut self,
        id: i64,
        node_ids: &[i64],
        tags: Option<TagMap>,
        visible: Option<bool>,
    ) -> GraphResult<&Way> {
        if self.ways.contains_key(&id) {
            return Err(GraphError::DuplicateId {
                kind: FeatureKind::Way,
                id,
            });
        }
        let node_ids = self.validate_way_nodes(id, node_ids)?;
        let way = Way::new(id, node_ids, tags.unwrap_or_default(), visible.unwrap_or(true));
        Ok(&*self.ways.entry(id).or_insert(way))
    }

    /// Prüft eine Node-Liste für einen Way und liefert sie normalisiert zurück.
    pub fn validate_way_nodes(&self, way_id: i64, node_ids: &[i64]) -> GraphResult<Vec<i64>> {
        if let Some(missing) = node_ids.iter().find(|id| !self.nodes.contains_key(id)) {
            return Err(GraphError::InvalidGraph(format!(
                "Way {way_id} referenziert fehlenden Node {missing}"
            )));
        }
        let collapsed = collapse_consecutive_duplicates(node_ids);
        let mut distinct = collapsed.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            return Err(GraphError::InvalidGraph(format!(
                "Way {way_id} braucht mindestens 2 verschiedene Nodes"
            )));
        }
        Ok(collapsed)
    }

    /// Ersetzt die Node-Liste eines bestehenden Ways (validiert wie `create_way`).
    pub fn set_way_nodes(&mut self, way_id: i64, node_ids: &[i64]) -> GraphResult<&Way> {
        if !self.ways.contains_key(&way_id) {
            return Err(GraphError::way_not_exists(way_id));
        }
        let node_ids = self.validate_way_nodes(way_id, node_ids)?;
        let way = self
            .ways
            .get_mut(&way_id)
            .ok_or_else(|| GraphError::way_not_exists(way_id))?;
        way.node_ids = node_ids;
        Ok(&*way)
    }

    /// Entfernt einen Node (ohne Kaskade auf Ways)
    pub fn delete_node(&mut self, node_id: i64) -> Option<Node> {
        let removed = self.nodes.remove(&node_id);
        if removed.is_some() {
            self.spatial_dirty = true;
        }
        removed
    }

    /// Entfernt einen Way (seine Nodes bleiben erhalten)
    pub fn delete_way(&mut self, way_id: i64) -> Option<Way> {
        self.ways.remove(&way_id)
    }

    /// Prüft ob ein Node mit dieser ID existiert.
    pub fn is_node_contains(&self, node_id: i64) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Prüft ob ein Way mit dieser ID existiert.
    pub fn is_way_contains(&self, way_id: i64) -> bool {
        self.ways.contains_key(&way_id)
    }

    /// Liefert einen Node oder `NotExists`.
    pub fn get_node(&self, node_id: i64) -> GraphResult<&Node> {
        self.nodes
            .get(&node_id)
            .ok_or_else(|| GraphError::node_not_exists(node_id))
    }

    /// Liefert einen Way oder `NotExists`.
    pub fn get_way(&self, way_id: i64) -> GraphResult<&Way> {
        self.ways
            .get(&way_id)
            .ok_or_else(|| GraphError::way_not_exists(way_id))
    }

    /// Veränderbarer Zugriff auf einen Node.
    pub fn get_node_mut(&mut self, node_id: i64) -> GraphResult<&mut Node> {
        self.nodes
            .get_mut(&node_id)
            .ok_or_else(|| GraphError::node_not_exists(node_id))
    }

    /// Veränderbarer Zugriff auf einen Way.
    pub fn get_way_mut(&mut self, way_id: i64) -> GraphResult<&mut Way> {
        self.ways
            .get_mut(&way_id)
            .ok_or_else(|| GraphError::way_not_exists(way_id))
    }

    /// Löst mehrere IDs auf; fehlende IDs werden still übersprungen.
    pub fn get_nodes(&self, node_ids: &[i64]) -> Vec<&Node> {
        node_ids.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    /// Positionen der Nodes eines Ways in Pfad-Reihenfolge.
    pub fn way_coordinates(&self, way_id: i64) -> GraphResult<Vec<LatLng>> {
        let way = self.get_way(way_id)?;
        way.node_ids
            .iter()
            .map(|id| self.get_node(*id).map(|n| n.position))
            .collect()
    }

    /// Aktualisiert die Position eines Nodes.
    pub fn update_node_position(&mut self, node_id: i64, position: LatLng) -> GraphResult<()> {
        let node = self.get_node_mut(node_id)?;
        if node.position != position {
            node.position = position;
            self.spatial_dirty = true;
        }
        Ok(())
    }

    /// IDs aller Ways, die den Node enthalten (aufsteigend sortiert).
    pub fn ways_containing(&self, node_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .ways
            .values()
            .filter(|w| w.contains_node(node_id))
            .map(|w| w.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Iterator über alle Nodes (read-only).
    pub fn nodes_iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterator über alle Ways (read-only).
    pub fn ways_iter(&self) -> impl Iterator<Item = &Way> {
        self.ways.values()
    }

    /// Alle Node-IDs aufsteigend sortiert.
    pub fn node_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Alle Way-IDs aufsteigend sortiert.
    pub fn way_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.ways.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Berechnet die nächste freie Node-ID
    pub fn next_node_id(&self) -> i64 {
        self.nodes.keys().max().copied().unwrap_or(0) + 1
    }

    /// Berechnet die nächste freie Way-ID
    pub fn next_way_id(&self) -> i64 {
        self.ways.keys().max().copied().unwrap_or(0) + 1
    }

    /// Gibt die Anzahl der Nodes zurück
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Gibt die Anzahl der Ways zurück
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Baut den Spatial-Index neu auf, falls sich Nodes geändert haben.
    pub fn ensure_spatial_index(&mut self) {
        if self.spatial_dirty {
            self.spatial_index = SpatialIndex::from_nodes(&self.nodes);
            self.spatial_dirty = false;
        }
    }

    /// Findet den nächstgelegenen Node zur Position.
    ///
    /// Nutzt den zuletzt aufgebauten Index (siehe `ensure_spatial_index`).
    pub fn nearest_node(&self, query: LatLng) -> Option<SpatialMatch> {
        self.spatial_index.nearest(query)
    }

    /// Findet alle Nodes innerhalb eines Radius (Grad).
    pub fn nodes_within_radius(&self, query: LatLng, radius: f64) -> Vec<SpatialMatch> {
        self.spatial_index.within_radius(query, radius)
    }
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}
