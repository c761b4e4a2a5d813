//! Geordneter Pfad durch mehrere Nodes.

use super::TagMap;

/// Ein Way referenziert seine Nodes nur per ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// Eindeutige ID innerhalb des Stores
    pub id: i64,
    /// Node-IDs in Pfad-Reihenfolge (≥ 2, keine direkt aufeinanderfolgenden Duplikate)
    pub node_ids: Vec<i64>,
    /// Klassifizierungs-Tags
    pub tags: TagMap,
    /// Sichtbarkeit
    pub visible: bool,
}

impl Way {
    /// Erstellt einen neuen Way (ohne Validierung, siehe `FeatureStore::create_way`)
    pub fn new(id: i64, node_ids: Vec<i64>, tags: TagMap, visible: bool) -> Self {
        Self {
            id,
            node_ids,
            tags,
            visible,
        }
    }

    /// Prüft ob der Node Teil des Ways ist.
    pub fn contains_node(&self, node_id: i64) -> bool {
        self.node_ids.contains(&node_id)
    }

    /// Benachbarte Node-Paare in Pfad-Reihenfolge.
    pub fn node_pairs(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.node_ids.windows(2).map(|w| (w[0], w[1]))
    }

    /// Index `i` des Paars `(node_ids[i], node_ids[i+1])`, das `a` und `b` verbindet
    /// (Reihenfolge egal).
    pub fn adjacent_pair_index(&self, a: i64, b: i64) -> Option<usize> {
        self.node_ids
            .windows(2)
            .position(|w| (w[0] == a && w[1] == b) || (w[0] == b && w[1] == a))
    }
}

/// Entfernt direkt aufeinanderfolgende Duplikate.
pub fn collapse_consecutive_duplicates(node_ids: &[i64]) -> Vec<i64> {
    let mut result: Vec<i64> = Vec::with_capacity(node_ids.len());
    for &id in node_ids {
        if result.last() != Some(&id) {
            result.push(id);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_pair_index_is_order_insensitive() {
        let way = Way::new(1, vec![10, 20, 30], TagMap::new(), true);
        assert_eq!(way.adjacent_pair_index(20, 30), Some(1));
        assert_eq!(way.adjacent_pair_index(30, 20), Some(1));
        assert_eq!(way.adjacent_pair_index(10, 30), None);
    }

    #[test]
    fn collapse_removes_only_consecutive_duplicates() {
        assert_eq!(
            collapse_consecutive_duplicates(&[1, 1, 2, 3, 3, 1]),
            vec![1, 2, 3, 1]
        );
    }
}
