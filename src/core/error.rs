//! Fehlertypen der Feature-Graph-Engine.
//!
//! Alle Fehler werden synchron an den Aufrufer zurückgegeben. Die Engine
//! versucht nichts erneut und verschluckt keine Fehler.

use thiserror::Error;

/// Art eines Features, auf das sich ein Fehler bezieht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Wegpunkt / Kreuzung
    Node,
    /// Pfad durch mehrere Nodes
    Way,
    /// Abgeleitetes Segment zwischen zwei benachbarten Nodes
    LineSegment,
    /// Tag-Schlüssel
    Tag,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeatureKind::Node => "Node",
            FeatureKind::Way => "Way",
            FeatureKind::LineSegment => "LineSegment",
            FeatureKind::Tag => "Tag",
        };
        f.write_str(name)
    }
}

/// Fehler der Graph-Operationen.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Lookup eines nicht vorhandenen Features
    #[error("{kind} '{id}' existiert nicht")]
    NotExists {
        /// Art des gesuchten Features
        kind: FeatureKind,
        /// ID bzw. Schlüssel als Text
        id: String,
    },

    /// Wert besteht die Typ-/Bereichsprüfung nicht
    #[error("Ungueltiger Wert fuer '{field}': {reason}")]
    InvalidValue {
        /// Betroffenes Feld
        field: String,
        /// Beschreibung des Problems
        reason: String,
    },

    /// Eingabe überschreitet die konfigurierte Maximallänge
    #[error("'{field}' ueberschreitet die Maximallaenge {max_length} (Laenge {length})")]
    ExceedMaxLength {
        /// Betroffenes Feld
        field: String,
        /// Erlaubte Maximallänge
        max_length: usize,
        /// Tatsächliche Länge
        length: usize,
    },

    /// CSV-Tag würde durch den Merge die maximale Anzahl Werte überschreiten
    #[error("Tag '{key}' erlaubt nicht mehr Werte (aktuell: {current_values:?})")]
    TagsMergeExceededValuesMaxCount {
        /// Tag-Schlüssel
        key: String,
        /// Werte vor dem Merge
        current_values: Vec<String>,
    },

    /// Skalarer Tag hat bereits einen abweichenden Wert
    #[error("Tag '{key}' hat bereits den Wert '{current_value}'")]
    TagsMergeValueAlreadyExists {
        /// Tag-Schlüssel
        key: String,
        /// Bereits gesetzter Wert
        current_value: String,
    },

    /// ID ist im Store bereits vergeben
    #[error("{kind} '{id}' existiert bereits")]
    DuplicateId {
        /// Art des Features
        kind: FeatureKind,
        /// Doppelte ID
        id: i64,
    },

    /// Strukturell ungültiger Graph (z.B. Way mit fehlenden Nodes)
    #[error("Ungueltiger Graph: {0}")]
    InvalidGraph(String),
}

impl GraphError {
    /// Kurzform für `NotExists` eines Nodes.
    pub fn node_not_exists(id: i64) -> Self {
        Self::NotExists {
            kind: FeatureKind::Node,
            id: id.to_string(),
        }
    }

    /// Kurzform für `NotExists` eines Ways.
    pub fn way_not_exists(id: i64) -> Self {
        Self::NotExists {
            kind: FeatureKind::Way,
            id: id.to_string(),
        }
    }
}

/// Ergebnis-Typ der Graph-Engine.
pub type GraphResult<T> = Result<T, GraphError>;
