//! Aufteilen eines Ways an einem Segment.
//!
//! Wird ein Segment mitten aus einem Way entfernt, zerfällt der Way in den Teil
//! vor und den Teil nach dem Segment. Teile mit weniger als zwei Nodes entfallen.

use super::Way;

/// Die beiden Hälften eines geteilten Ways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitParts {
    /// Nodes bis einschließlich Segment-Anfang
    pub left: Vec<i64>,
    /// Nodes ab Segment-Ende
    pub right: Vec<i64>,
}

impl SplitParts {
    /// Alle Teile, die als eigener Way gültig sind (≥ 2 Nodes).
    pub fn viable(&self) -> impl Iterator<Item = &Vec<i64>> {
        [&self.left, &self.right]
            .into_iter()
            .filter(|part| part.len() >= 2)
    }
}

/// Teilt die Node-Liste des Ways am Segment `a`–`b` (Reihenfolge egal).
///
/// `None`, wenn `a` und `b` im Way nicht benachbart sind.
pub fn split_at_segment(way: &Way, a: i64, b: i64) -> Option<SplitParts> {
    let index = way.adjacent_pair_index(a, b)?;
    Some(SplitParts {
        left: way.node_ids[..=index].to_vec(),
        right: way.node_ids[index + 1..].to_vec(),
    })
}

/// Protokoll einer Teilung: der Original-Way und die daraus entstandenen Ways.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRecord {
    /// Way im Zustand unmittelbar vor der Teilung
    pub original: Way,
    /// IDs der Ways, die nur als Nebenprodukt der Teilung existieren
    pub byproduct_way_ids: Vec<i64>,
}

impl SplitRecord {
    /// Prüft ob der Way ein Nebenprodukt dieser Teilung ist.
    pub fn produced(&self, way_id: i64) -> bool {
        self.byproduct_way_ids.contains(&way_id)
    }
}
