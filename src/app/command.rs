//! Löschbefehl mit vollständigem Snapshot für Undo.
//!
//! Ein `FeatureCommand` löscht Nodes und Line-Segmente. Das Löschen eines Nodes
//! entfernt jeden Way, der ihn enthält. Das Löschen eines Segments teilt seinen
//! Way in die Teile davor und danach. Member-Nodes, die danach zu keinem Way
//! mehr gehören, werden mit entfernt.

use crate::core::split::split_at_segment;
use crate::core::{
    geo, FeatureKind, FeatureStore, GraphError, GraphResult, LatLng, LineSegment,
    LineSegmentKey, LineSegmentManager, LineSegmentStyle, Node, SplitRecord, Way,
};
use std::collections::{HashMap, HashSet};

/// Zustand, den ein ausgeführter Befehl zum Rückgängigmachen braucht.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSnapshot {
    /// Direkt gelöschte Nodes
    pub deleted_nodes: Vec<Node>,
    /// Ways, die mit einem gelöschten Node entfernt wurden
    pub deleted_ways: Vec<Way>,
    /// Alle Member-Nodes betroffener Ways zum Zeitpunkt der Löschung
    pub member_nodes: HashMap<i64, Node>,
    /// Member-Nodes, die ohne Way übrig blieben und mit entfernt wurden
    pub orphaned_nodes: Vec<i64>,
    /// Entfernte Segmente samt Style
    pub removed_segments: Vec<LineSegment>,
    /// Teilungen in Ausführungs-Reihenfolge
    pub splits: Vec<SplitRecord>,
}

impl CommandSnapshot {
    fn is_byproduct(&self, way_id: i64) -> bool {
        self.splits.iter().any(|record| record.produced(way_id))
    }

    fn remember_members(&mut self, store: &FeatureStore, way: &Way) {
        for node in store.get_nodes(&way.node_ids) {
            self.member_nodes
                .entry(node.id)
                .or_insert_with(|| node.clone());
        }
    }
}

/// Strukturelle Änderungen eines `do`/`undo`-Durchlaufs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandEffect {
    /// Entfernte Nodes
    pub nodes_removed: Vec<i64>,
    /// Wiederhergestellte Nodes
    pub nodes_created: Vec<i64>,
    /// Entfernte Ways
    pub ways_removed: Vec<i64>,
    /// Neu angelegte oder wiederhergestellte Ways
    pub ways_created: Vec<i64>,
    /// Entfernte Segmente
    pub segments_removed: Vec<LineSegmentKey>,
    /// Neu angelegte oder wiederhergestellte Segmente
    pub segments_created: Vec<LineSegmentKey>,
}

impl CommandEffect {
    /// `true`, wenn sich nichts geändert hat.
    pub fn is_empty(&self) -> bool {
        self.nodes_removed.is_empty()
            && self.nodes_created.is_empty()
            && self.ways_removed.is_empty()
            && self.ways_created.is_empty()
            && self.segments_removed.is_empty()
            && self.segments_created.is_empty()
    }
}

/// Löschbefehl über Nodes und Line-Segmente.
#[derive(Debug, Clone)]
pub struct FeatureCommand {
    node_ids: Vec<i64>,
    segment_keys: Vec<LineSegmentKey>,
    snapshot: CommandSnapshot,
    center: Option<LatLng>,
}

impl FeatureCommand {
    /// Erstellt einen Befehl; Ziele werden erst bei `do_command` aufgelöst.
    pub fn new(node_ids: &[i64], segment_keys: &[LineSegmentKey]) -> Self {
        let mut seen_nodes = HashSet::new();
        let mut seen_segments = HashSet::new();
        Self {
            node_ids: node_ids
                .iter()
                .copied()
                .filter(|id| seen_nodes.insert(*id))
                .collect(),
            segment_keys: segment_keys
                .iter()
                .copied()
                .filter(|key| seen_segments.insert(*key))
                .collect(),
            snapshot: CommandSnapshot::default(),
            center: None,
        }
    }

    /// Ziel-Nodes
    pub fn node_ids(&self) -> &[i64] {
        &self.node_ids
    }

    /// Ziel-Segmente
    pub fn segment_keys(&self) -> &[LineSegmentKey] {
        &self.segment_keys
    }

    /// Snapshot der letzten Ausführung
    pub fn snapshot(&self) -> &CommandSnapshot {
        &self.snapshot
    }

    /// Schwerpunkt der gelöschten Features (für Kamera-Zentrierung).
    pub fn center(&self) -> Option<LatLng> {
        self.center
    }

    /// Führt die Löschung aus und ersetzt den Snapshot vollständig.
    ///
    /// Alle Ziele werden vorab gegen den aktuellen Store aufgelöst; fehlt eines,
    /// liefert der Befehl `NotExists` ohne etwas zu verändern.
    pub fn do_command(
        &mut self,
        store: &mut FeatureStore,
        segments: &mut LineSegmentManager,
    ) -> GraphResult<CommandEffect> {
        self.resolve_targets(store)?;

        let mut snapshot = CommandSnapshot::default();
        let mut effect = CommandEffect::default();
        let mut center_points = Vec::new();
        let mut ways_removed_by_nodes: HashSet<i64> = HashSet::new();

        for &node_id in &self.node_ids {
            for way_id in store.ways_containing(node_id) {
                let Some(way) = store.delete_way(way_id) else {
                    continue;
                };
                snapshot.remember_members(store, &way);
                for segment in segments.delete_line_segments_of_way(way_id) {
                    effect.segments_removed.push(segment.key());
                    snapshot.removed_segments.push(segment);
                }
                ways_removed_by_nodes.insert(way_id);
                effect.ways_removed.push(way_id);
                snapshot.deleted_ways.push(way);
            }
            for segment in segments.delete_line_segments_of_node(node_id) {
                effect.segments_removed.push(segment.key());
                snapshot.removed_segments.push(segment);
            }
            if let Some(node) = store.delete_node(node_id) {
                center_points.push(node.position);
                effect.nodes_removed.push(node_id);
                snapshot.deleted_nodes.push(node);
            }
        }

        for key in self.segment_keys.clone() {
            let Some(way_id) = resolve_segment_way(store, &snapshot.splits, &key) else {
                if ways_removed_by_nodes.contains(&key.way_id) {
                    log::debug!(
                        "Segment {}-{} entfällt mit Way {}",
                        key.node_low,
                        key.node_high,
                        key.way_id
                    );
                    continue;
                }
                return Err(segment_not_exists(&key));
            };
            if let Some(segment) = segments.get_line_segment(way_id, key.node_low, key.node_high)
            {
                center_points.extend(segment.path);
            }
            split_way(
                store,
                segments,
                way_id,
                key.node_low,
                key.node_high,
                &mut snapshot,
                &mut effect,
            )?;
        }

        let mut candidates: Vec<i64> = snapshot.member_nodes.keys().copied().collect();
        candidates.sort_unstable();
        for node_id in candidates {
            if store.is_node_contains(node_id) && store.ways_containing(node_id).is_empty() {
                for segment in segments.delete_line_segments_of_node(node_id) {
                    effect.segments_removed.push(segment.key());
                    snapshot.removed_segments.push(segment);
                }
                store.delete_node(node_id);
                effect.nodes_removed.push(node_id);
                snapshot.orphaned_nodes.push(node_id);
            }
        }

        log::info!(
            "Löschbefehl ausgeführt: {} Nodes, {} Ways, {} Segmente entfernt",
            effect.nodes_removed.len(),
            effect.ways_removed.len(),
            effect.segments_removed.len()
        );

        self.snapshot = snapshot;
        self.center = geo::centroid(&center_points);
        Ok(effect)
    }

    /// Stellt den Zustand vor `do_command` wieder her.
    ///
    /// Jeder Schritt prüft vor dem Anlegen, ob das Feature schon existiert;
    /// mehrfaches Aufrufen ist daher harmlos.
    pub fn undo(
        &self,
        store: &mut FeatureStore,
        segments: &mut LineSegmentManager,
    ) -> GraphResult<CommandEffect> {
        let snapshot = &self.snapshot;
        let mut effect = CommandEffect::default();

        // 1. Teilungen rückwärts abwickeln
        for record in snapshot.splits.iter().rev() {
            for &byproduct in &record.byproduct_way_ids {
                if store.delete_way(byproduct).is_some() {
                    for segment in segments.delete_line_segments_of_way(byproduct) {
                        effect.segments_removed.push(segment.key());
                    }
                    effect.ways_removed.push(byproduct);
                }
            }
            for &node_id in &record.original.node_ids {
                restore_member_node(store, snapshot, node_id, &mut effect)?;
            }
            restore_way(store, &record.original, &mut effect)?;
        }

        // 2. Member-Nodes gelöschter Ways
        for way in &snapshot.deleted_ways {
            for &node_id in &way.node_ids {
                restore_member_node(store, snapshot, node_id, &mut effect)?;
            }
        }

        // 3. Direkt gelöschte Nodes
        for node in &snapshot.deleted_nodes {
            if !store.is_node_contains(node.id) {
                recreate_node(store, node)?;
                effect.nodes_created.push(node.id);
            }
        }

        // 4. Gelöschte Ways (ohne Teilungs-Nebenprodukte)
        for way in &snapshot.deleted_ways {
            if !snapshot.is_byproduct(way.id) {
                restore_way(store, way, &mut effect)?;
            }
        }

        // 5. Segmente mit ihrem gespeicherten Style
        for segment in &snapshot.removed_segments {
            if !store.is_way_contains(segment.way_id) || snapshot.is_byproduct(segment.way_id) {
                continue;
            }
            if segments.restore_line_segment(segment.clone()) {
                effect.segments_created.push(segment.key());
            }
        }

        if effect.is_empty() {
            log::debug!("Undo ohne Änderungen (bereits rückgängig gemacht)");
        } else {
            log::info!(
                "Löschbefehl rückgängig: {} Nodes, {} Ways, {} Segmente wiederhergestellt",
                effect.nodes_created.len(),
                effect.ways_created.len(),
                effect.segments_created.len()
            );
        }
        Ok(effect)
    }

    fn resolve_targets(&self, store: &FeatureStore) -> GraphResult<()> {
        for &node_id in &self.node_ids {
            store.get_node(node_id)?;
        }
        for key in &self.segment_keys {
            let resolves = store
                .get_way(key.way_id)
                .map(|way| way.adjacent_pair_index(key.node_low, key.node_high).is_some())
                .unwrap_or(false);
            if !resolves {
                return Err(segment_not_exists(key));
            }
        }
        Ok(())
    }
}

fn segment_not_exists(key: &LineSegmentKey) -> GraphError {
    GraphError::NotExists {
        kind: FeatureKind::LineSegment,
        id: format!("{}:{}-{}", key.way_id, key.node_low, key.node_high),
    }
}

/// Findet den Way, der das Segment aktuell trägt, auch wenn der ursprüngliche
/// Way in diesem Befehl bereits geteilt wurde.
fn resolve_segment_way(
    store: &FeatureStore,
    splits: &[SplitRecord],
    key: &LineSegmentKey,
) -> Option<i64> {
    let carries = |way_id: i64| {
        store
            .get_way(way_id)
            .map(|way| way.adjacent_pair_index(key.node_low, key.node_high).is_some())
            .unwrap_or(false)
    };

    let mut candidates = vec![key.way_id];
    while let Some(way_id) = candidates.pop() {
        if carries(way_id) {
            return Some(way_id);
        }
        for record in splits.iter().filter(|r| r.original.id == way_id) {
            candidates.extend(record.byproduct_way_ids.iter().copied());
        }
    }
    None
}

fn split_way(
    store: &mut FeatureStore,
    segments: &mut LineSegmentManager,
    way_id: i64,
    node_a: i64,
    node_b: i64,
    snapshot: &mut CommandSnapshot,
    effect: &mut CommandEffect,
) -> GraphResult<()> {
    let original = store.get_way(way_id)?.clone();
    let parts = split_at_segment(&original, node_a, node_b).ok_or_else(|| {
        segment_not_exists(&LineSegmentKey::new(way_id, node_a, node_b))
    })?;
    snapshot.remember_members(store, &original);

    let mut styles: HashMap<(i64, i64), LineSegmentStyle> = HashMap::new();
    for segment in segments.delete_line_segments_of_way(way_id) {
        let key = segment.key();
        styles.insert((key.node_low, key.node_high), segment.style.clone());
        effect.segments_removed.push(key);
        snapshot.removed_segments.push(segment);
    }
    store.delete_way(way_id);
    effect.ways_removed.push(way_id);

    let mut byproduct_way_ids = Vec::new();
    for part in parts.viable() {
        let new_id = store.next_way_id();
        store.create_way(new_id, part, Some(original.tags.clone()), Some(original.visible))?;
        let way = store.get_way(new_id)?;
        for (a, b) in way.node_pairs() {
            let key = LineSegmentKey::new(new_id, a, b);
            let style = styles.get(&(key.node_low, key.node_high)).cloned();
            segments.create_line_segment(way, store.get_node(a)?, store.get_node(b)?, style)?;
            effect.segments_created.push(key);
        }
        effect.ways_created.push(new_id);
        byproduct_way_ids.push(new_id);
    }

    log::debug!(
        "Way {} am Segment {}-{} geteilt in {:?}",
        way_id,
        node_a,
        node_b,
        byproduct_way_ids
    );
    snapshot.splits.push(SplitRecord {
        original,
        byproduct_way_ids,
    });
    Ok(())
}

fn recreate_node(store: &mut FeatureStore, node: &Node) -> GraphResult<()> {
    store.create_node(
        node.id,
        node.position,
        Some(node.options()),
        Some(node.tags.clone()),
    )?;
    Ok(())
}

fn restore_member_node(
    store: &mut FeatureStore,
    snapshot: &CommandSnapshot,
    node_id: i64,
    effect: &mut CommandEffect,
) -> GraphResult<()> {
    if store.is_node_contains(node_id) {
        return Ok(());
    }
    let node = snapshot
        .member_nodes
        .get(&node_id)
        .ok_or_else(|| GraphError::node_not_exists(node_id))?;
    recreate_node(store, node)?;
    effect.nodes_created.push(node_id);
    Ok(())
}

fn restore_way(store: &mut FeatureStore, way: &Way, effect: &mut CommandEffect) -> GraphResult<()> {
    if store.is_way_contains(way.id) {
        return Ok(());
    }
    store.create_way(way.id, &way.node_ids, Some(way.tags.clone()), Some(way.visible))?;
    effect.ways_created.push(way.id);
    Ok(())
}

#[cfg(test)]
mod tests;
